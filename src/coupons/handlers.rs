use super::models::{
    Coupon, CouponSummary, CreateCouponRequest, MessageResponse, UpdateCouponRequest,
};
use super::services::CouponsService;
use super::validators::decode_image_payload;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::preferences::services::PreferencesService;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// GET /api/coupons - Current user's coupons, newest first
pub async fn list_coupons(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<Vec<Coupon>>, ApiError> {
    let app_state = state.read().await;
    let coupons_service = CouponsService::new(app_state.db.clone());

    let coupons = coupons_service.list_for_user(&user.id).await?;

    Ok(Json(coupons))
}

/// GET /api/coupons/summary - Total, active, expired and claimed counts
pub async fn coupon_summary(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<CouponSummary>, ApiError> {
    let app_state = state.read().await;
    let coupons_service = CouponsService::new(app_state.db.clone());

    let summary = coupons_service.summary(&user.id, Utc::now()).await?;

    Ok(Json(summary))
}

/// POST /api/coupons - Capture a coupon from an image
///
/// The image goes through the OCR provider named in the user's settings.
pub async fn create_coupon(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(request): Json<CreateCouponRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let app_state = state.read().await.clone();

    let payload = request
        .image
        .filter(|image| !image.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No image provided".to_string()))?;

    let image = decode_image_payload(&payload, app_state.max_image_bytes).map_err(|msg| {
        warn!(user_id = %user.id, error = %msg, "Rejected coupon image");
        ApiError::BadRequest(msg)
    })?;

    let preferences = PreferencesService::new(app_state.db.clone())
        .get(&user.id, &app_state.default_ocr_provider)
        .await?;
    let provider = app_state.ocr_registry.resolve(&preferences.ocr_provider);

    info!(
        user_id = %user.id,
        provider = %provider.name(),
        mime_type = %image.mime_type,
        image_bytes = image.bytes.len(),
        "Processing coupon image"
    );

    let scanned_at = Utc::now();
    let extracted = provider.extract(&image.bytes).await.map_err(|e| {
        error!(user_id = %user.id, provider = %provider.name(), error = %e, "Coupon extraction failed");
        ApiError::from(e)
    })?;

    let coupons_service = CouponsService::new(app_state.db.clone());
    let coupon = coupons_service
        .create(&user.id, extracted, Some(&image.mime_type), scanned_at)
        .await?;

    Ok((StatusCode::CREATED, Json(coupon)))
}

/// PATCH /api/coupons/:id - Mark as claimed or unclaimed
pub async fn update_coupon(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(coupon_id): Path<String>,
    Json(request): Json<UpdateCouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    let app_state = state.read().await;
    let coupons_service = CouponsService::new(app_state.db.clone());

    let coupon = match request.claimed {
        Some(claimed) => {
            coupons_service
                .set_claimed(&user.id, &coupon_id, claimed)
                .await?
        }
        None => coupons_service.get_for_user(&user.id, &coupon_id).await?,
    };

    Ok(Json(coupon))
}

/// DELETE /api/coupons/:id - Delete coupon
pub async fn delete_coupon(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Path(coupon_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let app_state = state.read().await;
    let coupons_service = CouponsService::new(app_state.db.clone());

    coupons_service.delete(&user.id, &coupon_id).await?;

    Ok(Json(MessageResponse {
        message: "Coupon deleted".to_string(),
    }))
}
