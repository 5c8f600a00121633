use super::handlers;
use axum::{
    routing::{get, patch},
    Router,
};

/// Creates the coupons router
///
/// # Routes
/// - `GET /api/coupons` / `POST /api/coupons` - List, capture from image
/// - `GET /api/coupons/summary` - Derived counts
/// - `PATCH /api/coupons/:id` / `DELETE /api/coupons/:id` - Claim flag, removal
pub fn coupons_routes() -> Router {
    Router::new()
        .route(
            "/api/coupons",
            get(handlers::list_coupons).post(handlers::create_coupon),
        )
        .route("/api/coupons/summary", get(handlers::coupon_summary))
        .route(
            "/api/coupons/:id",
            patch(handlers::update_coupon).delete(handlers::delete_coupon),
        )
}
