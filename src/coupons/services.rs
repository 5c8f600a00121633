use super::models::{format_timestamp, summarize, Coupon, CouponRow, CouponSummary};
use crate::common::{generate_coupon_id, ApiError};
use crate::services::ocr::ExtractedCoupon;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

const COUPON_COLUMNS: &str = "id, code, title, provider, discount, terms, expiry_date, deadline, claimed, scanned_at";

pub struct CouponsService {
    db: SqlitePool,
}

impl CouponsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// All coupons owned by a user, newest capture first
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Coupon>, ApiError> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {} FROM coupons WHERE user_id = ? ORDER BY scanned_at DESC, rowid DESC",
            COUPON_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// One coupon if it exists and belongs to the user
    pub async fn get_for_user(&self, user_id: &str, coupon_id: &str) -> Result<Coupon, ApiError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {} FROM coupons WHERE id = ? AND user_id = ?",
            COUPON_COLUMNS
        ))
        .bind(coupon_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Coupon not found".to_string()))?;

        Coupon::try_from(row)
    }

    /// Store a coupon built from OCR output
    pub async fn create(
        &self,
        user_id: &str,
        extracted: ExtractedCoupon,
        image_mime: Option<&str>,
        scanned_at: DateTime<Utc>,
    ) -> Result<Coupon, ApiError> {
        let coupon = Coupon::from_extraction(generate_coupon_id(), extracted, scanned_at);

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, user_id, code, title, provider, discount, terms,
                expiry_date, deadline, claimed, image_mime, scanned_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&coupon.id)
        .bind(user_id)
        .bind(&coupon.code)
        .bind(&coupon.title)
        .bind(&coupon.provider)
        .bind(&coupon.discount)
        .bind(&coupon.terms)
        .bind(format_timestamp(&coupon.expiry_date))
        .bind(coupon.deadline.as_ref().map(format_timestamp))
        .bind(coupon.claimed)
        .bind(image_mime)
        .bind(format_timestamp(&coupon.scanned_at))
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(
            user_id = %user_id,
            coupon_id = %coupon.id,
            code = %coupon.code,
            "Created coupon"
        );

        Ok(coupon)
    }

    pub async fn set_claimed(
        &self,
        user_id: &str,
        coupon_id: &str,
        claimed: bool,
    ) -> Result<Coupon, ApiError> {
        let result = sqlx::query("UPDATE coupons SET claimed = ? WHERE id = ? AND user_id = ?")
            .bind(claimed)
            .bind(coupon_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Coupon not found".to_string()));
        }

        info!(user_id = %user_id, coupon_id = %coupon_id, claimed = claimed, "Updated coupon");
        self.get_for_user(user_id, coupon_id).await
    }

    pub async fn delete(&self, user_id: &str, coupon_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = ? AND user_id = ?")
            .bind(coupon_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Coupon not found".to_string()));
        }

        info!(user_id = %user_id, coupon_id = %coupon_id, "Deleted coupon");
        Ok(())
    }

    pub async fn summary(&self, user_id: &str, now: DateTime<Utc>) -> Result<CouponSummary, ApiError> {
        let coupons = self.list_for_user(user_id).await?;
        Ok(summarize(&coupons, now))
    }
}
