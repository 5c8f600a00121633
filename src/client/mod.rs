//! # Client Module
//!
//! The single-screen coupon app without a UI toolkit attached:
//! - `ClientState` holding identity, coupons, settings, view and camera session
//! - `reducer::update`, the only place state changes
//! - `CouponApp`, the controller that runs effects against the camera, OCR,
//!   identity and storage seams
//!
//! A front end renders `CouponApp::state()` and forwards button presses to
//! the controller methods.

pub mod app;
pub mod camera;
pub mod reducer;
pub mod seed;
pub mod state;
pub mod store;


pub use app::CouponApp;
pub use camera::{CameraDevice, CameraError, CameraStream, Facing, Frame, SimulatedCamera, UnavailableCamera};
pub use reducer::{update, Action, Effect};
pub use state::{CameraSession, ClientState, ViewMode};
pub use store::{CouponStore, MemoryStore};
