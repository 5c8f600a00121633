// src/client/app.rs
//! Controller for the coupon app
//!
//! Owns the [`ClientState`] and the device handles. Every state change goes
//! through [`update`]; the effects it returns are carried out here, in order.
//! Camera acquisition is the only background work: it runs on a spawned task
//! and reports back through a channel drained by [`CouponApp::process_events`]
//! or [`CouponApp::next_camera_event`].

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::camera::{CameraDevice, CameraError, CameraStream, Facing, Frame, SimulatedCamera};
use super::reducer::{update, Action, Effect};
use super::seed::seed_coupons;
use super::state::ClientState;
use super::store::{CouponStore, MemoryStore};
use crate::common::generate_coupon_id;
use crate::coupons::CouponSummary;
use crate::preferences::SettingsChange;
use crate::services::identity::{DemoIdentityProvider, IdentityProvider, SignInRequest};
use crate::services::ocr::{MockOcr, OcrProvider};

/// Outcome of one camera acquisition
struct CameraEvent {
    request: u64,
    result: Result<Box<dyn CameraStream>, CameraError>,
}

pub struct CouponApp {
    state: ClientState,
    identity: Arc<dyn IdentityProvider>,
    camera: Arc<dyn CameraDevice>,
    ocr: Arc<dyn OcrProvider>,
    store: Box<dyn CouponStore>,
    events_tx: UnboundedSender<CameraEvent>,
    events_rx: UnboundedReceiver<CameraEvent>,
    /// Stream shown in the camera view
    stream: Option<Box<dyn CameraStream>>,
    /// Stream that just arrived, waiting for the reducer to accept or discard it
    arrived: Option<(u64, Box<dyn CameraStream>)>,
    /// Still taken on capture, waiting for OCR
    frame: Option<Frame>,
}

impl CouponApp {
    /// Starts from the stored collection, or the seed coupons if nothing was saved
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        camera: Arc<dyn CameraDevice>,
        ocr: Arc<dyn OcrProvider>,
        store: Box<dyn CouponStore>,
    ) -> Self {
        let coupons = store.load().unwrap_or_else(|| seed_coupons(Utc::now()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            state: ClientState::new(coupons),
            identity,
            camera,
            ocr,
            store,
            events_tx,
            events_rx,
            stream: None,
            arrived: None,
            frame: None,
        }
    }

    /// Demo sign-in, simulated camera, mock OCR, in-memory storage
    pub fn demo() -> Self {
        Self::new(
            Arc::new(DemoIdentityProvider::default()),
            Arc::new(SimulatedCamera::new()),
            Arc::new(MockOcr::new()),
            Box::new(MemoryStore::new()),
        )
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn summary(&self, now: DateTime<Utc>) -> CouponSummary {
        self.state.summary(now)
    }

    pub fn store(&self) -> &dyn CouponStore {
        self.store.as_ref()
    }

    /// Whether a camera feed is currently attached to the view
    pub fn has_live_stream(&self) -> bool {
        self.stream.as_ref().map_or(false, |s| s.is_active())
    }

    pub async fn sign_in(&mut self) {
        if self.state.is_signed_in() {
            return;
        }
        match self.identity.sign_in(&SignInRequest::default()).await {
            Ok(identity) => self.dispatch(Action::SignedIn(identity)).await,
            Err(e) => warn!(provider = %self.identity.name(), error = %e, "Sign-in failed"),
        }
    }

    pub async fn sign_out(&mut self) {
        self.dispatch(Action::SignOut).await;
    }

    pub async fn open_camera(&mut self) {
        self.dispatch(Action::OpenCamera).await;
    }

    pub async fn cancel_camera(&mut self) {
        self.dispatch(Action::CancelCamera).await;
    }

    /// Take a still, run it through OCR and add the result to the list
    pub async fn capture(&mut self) {
        self.dispatch(Action::Capture).await;
    }

    pub async fn toggle_claimed(&mut self, id: &str) {
        self.dispatch(Action::ToggleClaimed(id.to_string())).await;
    }

    pub async fn delete(&mut self, id: &str) {
        self.dispatch(Action::Delete(id.to_string())).await;
    }

    pub async fn open_settings(&mut self) {
        self.dispatch(Action::OpenSettings).await;
    }

    pub async fn close_settings(&mut self) {
        self.dispatch(Action::CloseSettings).await;
    }

    pub async fn update_settings(&mut self, change: SettingsChange) {
        self.dispatch(Action::UpdateSettings(change)).await;
    }

    /// Apply camera results that have already arrived, without waiting
    pub async fn process_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_camera_event(event).await;
        }
    }

    /// Wait for the next camera result and apply it
    pub async fn next_camera_event(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_camera_event(event).await;
        }
    }

    pub async fn dispatch(&mut self, action: Action) {
        let mut queue: VecDeque<Effect> = update(&mut self.state, action).into();

        while let Some(effect) = queue.pop_front() {
            if let Some(next) = self.run_effect(effect).await {
                queue.extend(update(&mut self.state, next));
            }
        }
    }

    async fn handle_camera_event(&mut self, event: CameraEvent) {
        let CameraEvent { request, result } = event;
        match result {
            Ok(stream) => {
                self.arrived = Some((request, stream));
                self.dispatch(Action::CameraReady { request }).await;
            }
            Err(e) => {
                self.dispatch(Action::CameraFailed {
                    request,
                    reason: e.to_string(),
                })
                .await;
            }
        }
    }

    async fn run_effect(&mut self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::AcquireCamera { request } => {
                let camera = Arc::clone(&self.camera);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = camera.open(Facing::Environment).await;
                    if let Err(mut unsent) = tx.send(CameraEvent { request, result }) {
                        // App is gone; release whatever was granted
                        if let Ok(stream) = unsent.0.result.as_mut() {
                            stream.stop();
                        }
                    }
                });
                None
            }
            Effect::AttachStream { request } => {
                match self.arrived.take() {
                    Some((arrived, stream)) if arrived == request => {
                        debug!(request, "Camera stream attached");
                        self.stream = Some(stream);
                    }
                    Some((arrived, mut stream)) => {
                        warn!(request, arrived, "Camera stream did not match request");
                        stream.stop();
                    }
                    None => {}
                }
                None
            }
            Effect::DiscardStream { request } => {
                if let Some((_, mut stream)) = self.arrived.take() {
                    debug!(request, "Stopping late camera stream");
                    stream.stop();
                }
                None
            }
            Effect::CaptureFrame => {
                let frame = match self.stream.as_mut() {
                    Some(stream) => stream.grab_frame().unwrap_or_else(|e| {
                        warn!(error = %e, "Could not grab a frame");
                        Frame::default()
                    }),
                    None => Frame::default(),
                };
                self.frame = Some(frame);
                None
            }
            Effect::ReleaseCamera => {
                if let Some(mut stream) = self.stream.take() {
                    stream.stop();
                    debug!("Camera stream released");
                }
                None
            }
            Effect::ExtractCoupon => {
                let frame = self.frame.take().unwrap_or_default();
                let scanned_at = Utc::now();
                match self.ocr.extract(&frame.bytes).await {
                    Ok(extracted) => Some(Action::CaptureCompleted {
                        id: generate_coupon_id(),
                        extracted,
                        scanned_at,
                    }),
                    Err(e) => Some(Action::CaptureFailed {
                        reason: format!("{} OCR: {}", self.ocr.name(), e),
                    }),
                }
            }
            Effect::Persist => {
                self.store.save(&self.state.coupons);
                None
            }
        }
    }
}

impl Drop for CouponApp {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        if let Some((_, mut stream)) = self.arrived.take() {
            stream.stop();
        }
    }
}
