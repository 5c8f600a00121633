use super::models::{Preferences, UpdatePreferencesRequest};
use super::services::PreferencesService;
use super::validators::UpdatePreferencesValidator;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState, Validator};
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;

/// GET /api/settings - Current user's settings
pub async fn get_settings(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<Preferences>, ApiError> {
    let app_state = state.read().await;
    let service = PreferencesService::new(app_state.db.clone());

    let preferences = service
        .get(&user.id, &app_state.default_ocr_provider)
        .await?;

    Ok(Json(preferences))
}

/// POST /api/settings - Partial settings update
pub async fn update_settings(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(request): Json<UpdatePreferencesRequest>,
) -> Result<Json<Preferences>, ApiError> {
    let app_state = state.read().await;

    let known_providers = app_state.ocr_registry.names();
    let validator = UpdatePreferencesValidator {
        known_providers: &known_providers,
    };
    let validation_result = validator.validate(&request);
    if !validation_result.is_valid {
        return Err(ApiError::from(validation_result));
    }

    let service = PreferencesService::new(app_state.db.clone());
    let preferences = service
        .update(&user.id, request, &app_state.default_ocr_provider)
        .await?;

    Ok(Json(preferences))
}
