use super::handlers;
use axum::{routing::get, Router};

/// Creates the settings router
pub fn preferences_routes() -> Router {
    Router::new().route(
        "/api/settings",
        get(handlers::get_settings).post(handlers::update_settings),
    )
}
