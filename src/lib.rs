// src/lib.rs
//! Coupon capture service
//!
//! - [`client`]: the coupon app state machine and its device seams
//! - everything else: the REST API behind it (sign-in, coupons, settings, OCR)

use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod client;
pub mod common;
pub mod coupons;
pub mod health;
pub mod logging_middleware;
pub mod preferences;
pub mod services;

use common::AppState;

/// Full API router with logging, shared state, CORS and tracing layers
pub fn build_router(shared: Arc<RwLock<AppState>>, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true);

    Router::new()
        .merge(auth::auth_routes())
        .merge(coupons::coupons_routes())
        .merge(preferences::preferences_routes())
        .merge(health::health_routes())
        .fallback(health::not_found)
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
