//! # Coupons Module
//!
//! This module handles the coupon collection:
//! - Coupon model and derived expiry values
//! - Capture from an uploaded image through the user's OCR provider
//! - Claim/unclaim and delete
//! - Per-user summary counts

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use models::{summarize, Coupon, CouponSummary};
pub use routes::coupons_routes;
