use super::handlers;
use axum::{routing::get, Router};

/// Creates the health router
pub fn health_routes() -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/test-auth", get(handlers::test_auth))
}
