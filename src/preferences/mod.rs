//! # Preferences Module
//!
//! Per-user settings: auto-delete rules, expiry notification lead time,
//! calendar sync and the OCR provider used for new captures. The first
//! four are recorded for the user and returned as-is; nothing acts on them.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use models::{Preferences, SettingsChange, UpdatePreferencesRequest};
pub use routes::preferences_routes;
