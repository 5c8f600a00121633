use crate::common::ApiError;
use axum::{http::Uri, Json};
use serde_json::{json, Value};
use tracing::debug;

/// GET /api/health - Liveness probe
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/test-auth - Confirms the API answers cross-origin requests
pub async fn test_auth() -> Json<Value> {
    Json(json!({
        "message": "Backend is working",
        "cors": "enabled"
    }))
}

/// Router fallback
pub async fn not_found(uri: Uri) -> ApiError {
    debug!(path = %uri.path(), "No route matched");
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
