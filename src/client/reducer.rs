// src/client/reducer.rs
//! State transitions of the coupon app
//!
//! [`update`] applies one [`Action`] to the state and returns the side effects
//! the controller has to carry out. It never touches a device or a clock.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::state::{CameraSession, ClientState, ViewMode};
use crate::coupons::Coupon;
use crate::preferences::SettingsChange;
use crate::services::identity::Identity;
use crate::services::ocr::ExtractedCoupon;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SignedIn(Identity),
    SignOut,
    OpenCamera,
    /// The platform granted the stream asked for by `request`
    CameraReady { request: u64 },
    CameraFailed { request: u64, reason: String },
    CancelCamera,
    Capture,
    CaptureCompleted {
        id: String,
        extracted: ExtractedCoupon,
        scanned_at: DateTime<Utc>,
    },
    CaptureFailed { reason: String },
    ToggleClaimed(String),
    Delete(String),
    OpenSettings,
    CloseSettings,
    UpdateSettings(SettingsChange),
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::SignedIn(_) => "SignedIn",
            Action::SignOut => "SignOut",
            Action::OpenCamera => "OpenCamera",
            Action::CameraReady { .. } => "CameraReady",
            Action::CameraFailed { .. } => "CameraFailed",
            Action::CancelCamera => "CancelCamera",
            Action::Capture => "Capture",
            Action::CaptureCompleted { .. } => "CaptureCompleted",
            Action::CaptureFailed { .. } => "CaptureFailed",
            Action::ToggleClaimed(_) => "ToggleClaimed",
            Action::Delete(_) => "Delete",
            Action::OpenSettings => "OpenSettings",
            Action::CloseSettings => "CloseSettings",
            Action::UpdateSettings(_) => "UpdateSettings",
        }
    }
}

/// Work for the controller, executed in the order returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the device for an environment-facing stream
    AcquireCamera { request: u64 },
    /// Show the stream that arrived for `request`
    AttachStream { request: u64 },
    /// Stop a stream that arrived after its request was abandoned
    DiscardStream { request: u64 },
    /// Take a still from the attached stream, if any
    CaptureFrame,
    /// Stop the attached stream
    ReleaseCamera,
    /// Run the captured still through OCR
    ExtractCoupon,
    /// Save the coupon collection
    Persist,
}

pub fn update(state: &mut ClientState, action: Action) -> Vec<Effect> {
    match action {
        Action::SignedIn(identity) => sign_in(state, identity),
        // Acquisition results are handled even when signed out so a late
        // stream is still stopped
        Action::CameraReady { request } => camera_ready(state, request),
        Action::CameraFailed { request, reason } => camera_failed(state, request, &reason),
        Action::SignOut => sign_out(state),
        action if !state.is_signed_in() => {
            debug!(action = action.name(), "Ignoring action while signed out");
            Vec::new()
        }
        Action::OpenCamera => open_camera(state),
        Action::CancelCamera => cancel_camera(state),
        Action::Capture => capture(state),
        Action::CaptureCompleted {
            id,
            extracted,
            scanned_at,
        } => capture_completed(state, id, extracted, scanned_at),
        Action::CaptureFailed { reason } => capture_failed(state, &reason),
        Action::ToggleClaimed(id) => toggle_claimed(state, &id),
        Action::Delete(id) => delete(state, &id),
        Action::OpenSettings => {
            if state.view == ViewMode::List {
                state.view = ViewMode::Settings;
            }
            Vec::new()
        }
        Action::CloseSettings => {
            if state.view == ViewMode::Settings {
                state.view = ViewMode::List;
            }
            Vec::new()
        }
        Action::UpdateSettings(change) => {
            debug!(?change, "Settings changed");
            state.settings.apply(change);
            Vec::new()
        }
    }
}

fn sign_in(state: &mut ClientState, identity: Identity) -> Vec<Effect> {
    if let Some(current) = &state.identity {
        debug!(user_id = %current.id, "Already signed in");
        return Vec::new();
    }
    info!(user_id = %identity.id, "Signed in");
    state.identity = Some(identity);
    Vec::new()
}

fn sign_out(state: &mut ClientState) -> Vec<Effect> {
    info!(discarded = state.coupons.len(), "Signed out");
    state.identity = None;
    state.coupons.clear();
    state.view = ViewMode::List;
    state.camera = CameraSession::Closed;
    vec![Effect::ReleaseCamera, Effect::Persist]
}

fn open_camera(state: &mut ClientState) -> Vec<Effect> {
    if state.view == ViewMode::Camera {
        return Vec::new();
    }
    let request = state.next_request();
    state.view = ViewMode::Camera;
    state.camera = CameraSession::Pending { request };
    vec![Effect::AcquireCamera { request }]
}

fn camera_ready(state: &mut ClientState, request: u64) -> Vec<Effect> {
    if state.camera == (CameraSession::Pending { request }) {
        state.camera = CameraSession::Live { request };
        vec![Effect::AttachStream { request }]
    } else {
        debug!(request, session = ?state.camera, "Discarding stale camera stream");
        vec![Effect::DiscardStream { request }]
    }
}

fn camera_failed(state: &mut ClientState, request: u64, reason: &str) -> Vec<Effect> {
    if state.camera == (CameraSession::Pending { request }) {
        warn!(request, reason = %reason, "Camera unavailable");
        state.camera = CameraSession::Unavailable { request };
    } else {
        debug!(request, reason = %reason, "Ignoring stale camera failure");
    }
    Vec::new()
}

fn cancel_camera(state: &mut ClientState) -> Vec<Effect> {
    if state.view != ViewMode::Camera || state.camera == CameraSession::Processing {
        return Vec::new();
    }
    state.view = ViewMode::List;
    state.camera = CameraSession::Closed;
    vec![Effect::ReleaseCamera]
}

fn capture(state: &mut ClientState) -> Vec<Effect> {
    if state.view != ViewMode::Camera || !state.camera.is_capturable() {
        return Vec::new();
    }
    state.camera = CameraSession::Processing;
    vec![Effect::CaptureFrame, Effect::ReleaseCamera, Effect::ExtractCoupon]
}

fn capture_completed(
    state: &mut ClientState,
    id: String,
    extracted: ExtractedCoupon,
    scanned_at: DateTime<Utc>,
) -> Vec<Effect> {
    if state.camera != CameraSession::Processing {
        debug!(coupon_id = %id, "Dropping capture result with no capture in progress");
        return Vec::new();
    }
    let coupon = Coupon::from_extraction(id, extracted, scanned_at);
    info!(coupon_id = %coupon.id, code = %coupon.code, "Captured coupon");
    state.coupons.insert(0, coupon);
    state.view = ViewMode::List;
    state.camera = CameraSession::Closed;
    vec![Effect::Persist]
}

fn capture_failed(state: &mut ClientState, reason: &str) -> Vec<Effect> {
    if state.camera != CameraSession::Processing {
        return Vec::new();
    }
    warn!(reason = %reason, "Coupon capture failed");
    state.view = ViewMode::List;
    state.camera = CameraSession::Closed;
    Vec::new()
}

fn toggle_claimed(state: &mut ClientState, id: &str) -> Vec<Effect> {
    match state.coupons.iter_mut().find(|c| c.id == id) {
        Some(coupon) => {
            coupon.claimed = !coupon.claimed;
            vec![Effect::Persist]
        }
        None => {
            debug!(coupon_id = %id, "Toggle on unknown coupon");
            Vec::new()
        }
    }
}

fn delete(state: &mut ClientState, id: &str) -> Vec<Effect> {
    match state.coupons.iter().position(|c| c.id == id) {
        Some(index) => {
            state.coupons.remove(index);
            vec![Effect::Persist]
        }
        None => {
            debug!(coupon_id = %id, "Delete on unknown coupon");
            Vec::new()
        }
    }
}
