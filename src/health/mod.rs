//! # Health Module
//!
//! Liveness endpoints used by the frontend to check the backend is reachable,
//! plus the JSON 404 fallback for unknown routes.

pub mod handlers;
pub mod routes;

pub use handlers::not_found;
pub use routes::health_routes;
