use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::services::ocr::MOCK_PROVIDER;

pub const DEFAULT_NOTIFY_BEFORE_EXPIRY_DAYS: i64 = 3;

/// A user's settings record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub auto_delete_expired: bool,
    pub auto_delete_claimed: bool,
    /// Days of notice before a coupon expires
    pub notify_before_expiry: i64,
    #[serde(rename = "syncGoogleCalendar")]
    pub sync_calendar: bool,
    pub ocr_provider: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_delete_expired: false,
            auto_delete_claimed: false,
            notify_before_expiry: DEFAULT_NOTIFY_BEFORE_EXPIRY_DAYS,
            sync_calendar: false,
            ocr_provider: MOCK_PROVIDER.to_string(),
        }
    }
}

impl Preferences {
    /// Write exactly the one field `change` names
    pub fn apply(&mut self, change: SettingsChange) {
        match change {
            SettingsChange::AutoDeleteExpired(value) => self.auto_delete_expired = value,
            SettingsChange::AutoDeleteClaimed(value) => self.auto_delete_claimed = value,
            SettingsChange::NotifyBeforeExpiry(days) => self.notify_before_expiry = days,
            SettingsChange::SyncCalendar(value) => self.sync_calendar = value,
            SettingsChange::OcrProvider(name) => self.ocr_provider = name,
        }
    }

    /// Apply every field present in a partial update
    pub fn merge(&mut self, update: UpdatePreferencesRequest) {
        for change in update.into_changes() {
            self.apply(change);
        }
    }
}

/// One settings control changing one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsChange {
    AutoDeleteExpired(bool),
    AutoDeleteClaimed(bool),
    NotifyBeforeExpiry(i64),
    SyncCalendar(bool),
    OcrProvider(String),
}

/// Database row in `user_settings`
#[derive(Debug, Clone, FromRow)]
pub struct PreferencesRow {
    pub auto_delete_expired: bool,
    pub auto_delete_claimed: bool,
    pub notify_before_expiry_days: i64,
    pub sync_google_calendar: bool,
    pub ocr_provider: String,
}

impl From<PreferencesRow> for Preferences {
    fn from(row: PreferencesRow) -> Self {
        Self {
            auto_delete_expired: row.auto_delete_expired,
            auto_delete_claimed: row.auto_delete_claimed,
            notify_before_expiry: row.notify_before_expiry_days,
            sync_calendar: row.sync_google_calendar,
            ocr_provider: row.ocr_provider,
        }
    }
}

/// Partial update body for `POST /api/settings`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    pub auto_delete_expired: Option<bool>,
    pub auto_delete_claimed: Option<bool>,
    pub notify_before_expiry: Option<i64>,
    pub sync_google_calendar: Option<bool>,
    pub ocr_provider: Option<String>,
}

impl UpdatePreferencesRequest {
    pub fn into_changes(self) -> Vec<SettingsChange> {
        let mut changes = Vec::new();
        if let Some(v) = self.auto_delete_expired {
            changes.push(SettingsChange::AutoDeleteExpired(v));
        }
        if let Some(v) = self.auto_delete_claimed {
            changes.push(SettingsChange::AutoDeleteClaimed(v));
        }
        if let Some(v) = self.notify_before_expiry {
            changes.push(SettingsChange::NotifyBeforeExpiry(v));
        }
        if let Some(v) = self.sync_google_calendar {
            changes.push(SettingsChange::SyncCalendar(v));
        }
        if let Some(v) = self.ocr_provider {
            changes.push(SettingsChange::OcrProvider(v));
        }
        changes
    }
}
