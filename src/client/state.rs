use chrono::{DateTime, Utc};

use crate::coupons::{summarize, Coupon, CouponSummary};
use crate::preferences::Preferences;
use crate::services::identity::Identity;

/// Which screen is showing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    List,
    /// Settings overlay on top of the list
    Settings,
    Camera,
}

/// Lifecycle of the camera feed behind the camera view
///
/// `request` numbers tie an acquisition result back to the open that asked
/// for it; a result carrying any other number is stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CameraSession {
    #[default]
    Closed,
    Pending { request: u64 },
    Live { request: u64 },
    /// Access denied or no device; the view stays open without a feed
    Unavailable { request: u64 },
    Processing,
}

impl CameraSession {
    pub fn is_capturable(&self) -> bool {
        matches!(
            self,
            CameraSession::Pending { .. } | CameraSession::Live { .. } | CameraSession::Unavailable { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientState {
    pub identity: Option<Identity>,
    /// Newest capture first
    pub coupons: Vec<Coupon>,
    pub settings: Preferences,
    pub view: ViewMode,
    pub camera: CameraSession,
    last_request: u64,
}

impl ClientState {
    pub fn new(coupons: Vec<Coupon>) -> Self {
        Self {
            coupons,
            ..Self::default()
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn coupon(&self, id: &str) -> Option<&Coupon> {
        self.coupons.iter().find(|c| c.id == id)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> CouponSummary {
        summarize(&self.coupons, now)
    }

    pub(crate) fn next_request(&mut self) -> u64 {
        self.last_request += 1;
        self.last_request
    }
}
