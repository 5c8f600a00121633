use chrono::{DateTime, Duration, Utc};

use crate::coupons::Coupon;

/// Starter collection shown before anything has been saved: one live
/// coupon and one that lapsed a day ago
pub fn seed_coupons(now: DateTime<Utc>) -> Vec<Coupon> {
    vec![
        Coupon {
            id: "CP_5EED01".to_string(),
            code: "SAVE20".to_string(),
            title: "20% Off Electronics".to_string(),
            provider: "TechMart".to_string(),
            discount: "20% off".to_string(),
            terms: "Valid on electronics only. Cannot be combined with other offers.".to_string(),
            expiry_date: now + Duration::days(15),
            deadline: Some(now + Duration::days(10)),
            claimed: false,
            scanned_at: now - Duration::days(2),
        },
        Coupon {
            id: "CP_5EED02".to_string(),
            code: "EXPIRED10".to_string(),
            title: "10% Off Groceries".to_string(),
            provider: "FreshFoods".to_string(),
            discount: "10% off".to_string(),
            terms: "Minimum purchase $30.".to_string(),
            expiry_date: now - Duration::days(1),
            deadline: Some(now - Duration::days(3)),
            claimed: false,
            scanned_at: now - Duration::days(20),
        },
    ]
}
