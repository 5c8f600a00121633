use crate::coupons::Coupon;

/// Where the coupon collection is kept between sessions
pub trait CouponStore: Send {
    /// Last saved collection, or `None` if nothing was ever saved
    fn load(&self) -> Option<Vec<Coupon>>;

    fn save(&mut self, coupons: &[Coupon]);
}

/// Keeps the latest snapshot in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<Vec<Coupon>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(coupons: Vec<Coupon>) -> Self {
        Self {
            snapshot: Some(coupons),
        }
    }
}

impl CouponStore for MemoryStore {
    fn load(&self) -> Option<Vec<Coupon>> {
        self.snapshot.clone()
    }

    fn save(&mut self, coupons: &[Coupon]) {
        self.snapshot = Some(coupons.to_vec());
    }
}
