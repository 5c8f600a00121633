// src/client/camera.rs
//! Camera seam
//!
//! The host platform supplies a [`CameraDevice`]; the app asks it for an
//! environment-facing stream when the camera view opens and stops the stream
//! as soon as the view no longer needs it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("no camera facing {0:?}")]
    NotFound(Facing),

    #[error("camera stream stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Rear camera, pointed away from the user
    Environment,
    User,
}

/// One still image taken from a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Resolves once the platform grants or denies access
    async fn open(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A live video feed. Must be stopped explicitly to release the device.
pub trait CameraStream: Send {
    fn grab_frame(&mut self) -> Result<Frame, CameraError>;

    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Software camera producing numbered frames
///
/// Counts streams that were opened and not yet stopped, so callers can check
/// nothing is left running.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCamera {
    open_delay: Duration,
    active: Arc<AtomicUsize>,
    frames: Arc<AtomicU64>,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera that takes `delay` to grant access
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            open_delay: delay,
            ..Self::default()
        }
    }

    pub fn active_streams(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for SimulatedCamera {
    async fn open(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CameraError> {
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        debug!(?facing, "Simulated camera stream opened");

        Ok(Box::new(SimulatedStream {
            active: Arc::clone(&self.active),
            frames: Arc::clone(&self.frames),
            running: true,
        }))
    }
}

struct SimulatedStream {
    active: Arc<AtomicUsize>,
    frames: Arc<AtomicU64>,
    running: bool,
}

impl CameraStream for SimulatedStream {
    fn grab_frame(&mut self) -> Result<Frame, CameraError> {
        if !self.running {
            return Err(CameraError::Stopped);
        }
        let n = self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(Frame {
            bytes: format!("simulated-frame-{}", n).into_bytes(),
        })
    }

    fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.active.fetch_sub(1, Ordering::SeqCst);
            debug!("Simulated camera stream stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.running
    }
}

/// A device that always refuses access
#[derive(Debug, Clone)]
pub struct UnavailableCamera {
    error: CameraError,
}

impl UnavailableCamera {
    pub fn new(error: CameraError) -> Self {
        Self { error }
    }
}

impl Default for UnavailableCamera {
    fn default() -> Self {
        Self::new(CameraError::PermissionDenied)
    }
}

#[async_trait]
impl CameraDevice for UnavailableCamera {
    async fn open(&self, _facing: Facing) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_stream_counts_and_stops_once() {
        let camera = SimulatedCamera::new();
        let mut stream = camera.open(Facing::Environment).await.unwrap();
        assert_eq!(camera.active_streams(), 1);

        let first = stream.grab_frame().unwrap();
        let second = stream.grab_frame().unwrap();
        assert_ne!(first, second);

        stream.stop();
        stream.stop();
        assert_eq!(camera.active_streams(), 0);
        assert_eq!(stream.grab_frame(), Err(CameraError::Stopped));
    }

    #[tokio::test]
    async fn test_unavailable_camera_refuses() {
        let camera = UnavailableCamera::default();
        let result = camera.open(Facing::Environment).await;
        assert!(matches!(result, Err(CameraError::PermissionDenied)));
    }
}
