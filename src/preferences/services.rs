use super::models::{Preferences, PreferencesRow, UpdatePreferencesRequest};
use crate::common::ApiError;
use crate::services::ocr::MOCK_PROVIDER;
use sqlx::SqlitePool;
use tracing::{debug, info};

pub struct PreferencesService {
    db: SqlitePool,
}

impl PreferencesService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert the default settings row for a user unless one exists
    pub async fn ensure_defaults(
        &self,
        user_id: &str,
        default_ocr_provider: &str,
    ) -> Result<(), ApiError> {
        let ocr_provider = if default_ocr_provider.is_empty() {
            MOCK_PROVIDER
        } else {
            default_ocr_provider
        };

        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_settings (user_id, ocr_provider) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(ocr_provider)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() > 0 {
            debug!(user_id = %user_id, ocr_provider = %ocr_provider, "Created default settings");
        }
        Ok(())
    }

    /// Settings for a user, created with defaults on first read
    pub async fn get(
        &self,
        user_id: &str,
        default_ocr_provider: &str,
    ) -> Result<Preferences, ApiError> {
        self.ensure_defaults(user_id, default_ocr_provider).await?;

        let row = sqlx::query_as::<_, PreferencesRow>(
            r#"
            SELECT auto_delete_expired, auto_delete_claimed, notify_before_expiry_days,
                   sync_google_calendar, ocr_provider
            FROM user_settings
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(row.into())
    }

    /// Apply a partial update and return the stored result
    ///
    /// Validation is the caller's job.
    pub async fn update(
        &self,
        user_id: &str,
        request: UpdatePreferencesRequest,
        default_ocr_provider: &str,
    ) -> Result<Preferences, ApiError> {
        let mut preferences = self.get(user_id, default_ocr_provider).await?;
        preferences.merge(request);

        sqlx::query(
            r#"
            UPDATE user_settings SET
                auto_delete_expired = ?,
                auto_delete_claimed = ?,
                notify_before_expiry_days = ?,
                sync_google_calendar = ?,
                ocr_provider = ?,
                updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            WHERE user_id = ?
            "#,
        )
        .bind(preferences.auto_delete_expired)
        .bind(preferences.auto_delete_claimed)
        .bind(preferences.notify_before_expiry)
        .bind(preferences.sync_calendar)
        .bind(&preferences.ocr_provider)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(user_id = %user_id, "Updated settings");
        Ok(preferences)
    }
}
