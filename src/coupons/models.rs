use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::ApiError;
use crate::services::ocr::ExtractedCoupon;

/// Days a captured coupon stays valid when the image shows no expiry
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;

/// A discount offer with its validity window and claim status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub title: String,
    pub provider: String,
    pub discount: String,
    pub terms: String,
    pub expiry_date: DateTime<Utc>,
    /// Advisory date before expiry; nothing interprets it
    pub deadline: Option<DateTime<Utc>>,
    pub claimed: bool,
    pub scanned_at: DateTime<Utc>,
}

impl Coupon {
    /// Build an unclaimed coupon from OCR output, filling gaps with defaults
    pub fn from_extraction(id: String, extracted: ExtractedCoupon, scanned_at: DateTime<Utc>) -> Self {
        Self {
            id,
            code: extracted.code.unwrap_or_else(|| "UNKNOWN".to_string()),
            title: extracted.title.unwrap_or_else(|| "Coupon".to_string()),
            provider: extracted.provider.unwrap_or_default(),
            discount: extracted.discount.unwrap_or_default(),
            terms: extracted.terms.unwrap_or_default(),
            expiry_date: extracted
                .expiry_date
                .unwrap_or(scanned_at + Duration::days(DEFAULT_VALIDITY_DAYS)),
            deadline: extracted.deadline,
            claimed: false,
            scanned_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    /// Whole days left, rounded up; zero or negative once expired
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let remaining = self.expiry_date - now;
        // num_days truncates toward zero, which is already the ceiling below zero
        let days = remaining.num_days();
        if remaining > Duration::days(days) {
            days + 1
        } else {
            days
        }
    }

    /// Neither expired nor claimed
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.claimed && !self.is_expired(now)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponSummary {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub claimed: usize,
}

pub fn summarize(coupons: &[Coupon], now: DateTime<Utc>) -> CouponSummary {
    coupons.iter().fold(
        CouponSummary {
            total: coupons.len(),
            ..CouponSummary::default()
        },
        |mut summary, coupon| {
            if coupon.is_active(now) {
                summary.active += 1;
            }
            if coupon.is_expired(now) {
                summary.expired += 1;
            }
            if coupon.claimed {
                summary.claimed += 1;
            }
            summary
        },
    )
}

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::InternalServer(format!("corrupt {} '{}': {}", field, value, e)))
}

/// Database row in `coupons`
#[derive(Debug, Clone, FromRow)]
pub struct CouponRow {
    pub id: String,
    pub code: String,
    pub title: String,
    pub provider: String,
    pub discount: String,
    pub terms: String,
    pub expiry_date: String,
    pub deadline: Option<String>,
    pub claimed: bool,
    pub scanned_at: String,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = ApiError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        Ok(Coupon {
            expiry_date: parse_timestamp("expiry_date", &row.expiry_date)?,
            deadline: row
                .deadline
                .as_deref()
                .map(|d| parse_timestamp("deadline", d))
                .transpose()?,
            scanned_at: parse_timestamp("scanned_at", &row.scanned_at)?,
            id: row.id,
            code: row.code,
            title: row.title,
            provider: row.provider,
            discount: row.discount,
            terms: row.terms,
            claimed: row.claimed,
        })
    }
}

/// Body of `POST /api/coupons`: a base64 image, optionally as a data URL
#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    pub image: Option<String>,
}

/// Body of `PATCH /api/coupons/:id`
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCouponRequest {
    pub claimed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
