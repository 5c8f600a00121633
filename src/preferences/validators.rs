use super::models::UpdatePreferencesRequest;
use crate::common::{ValidationResult, Validator};

pub const MIN_NOTIFY_DAYS: i64 = 1;
pub const MAX_NOTIFY_DAYS: i64 = 365;

/// Validates a settings update against the registered OCR provider names
pub struct UpdatePreferencesValidator<'a> {
    pub known_providers: &'a [String],
}

impl Validator<UpdatePreferencesRequest> for UpdatePreferencesValidator<'_> {
    fn validate(&self, data: &UpdatePreferencesRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(days) = data.notify_before_expiry {
            if !(MIN_NOTIFY_DAYS..=MAX_NOTIFY_DAYS).contains(&days) {
                result.add_error(
                    "notifyBeforeExpiry",
                    &format!(
                        "must be between {} and {} days",
                        MIN_NOTIFY_DAYS, MAX_NOTIFY_DAYS
                    ),
                );
            }
        }

        if let Some(provider) = &data.ocr_provider {
            if !self.known_providers.iter().any(|p| p == provider) {
                result.add_error(
                    "ocrProvider",
                    &format!(
                        "unknown provider '{}', expected one of: {}",
                        provider,
                        self.known_providers.join(", ")
                    ),
                );
            }
        }

        result
    }
}
