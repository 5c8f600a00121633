// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::services::identity::IdentityProvider;
use crate::services::ocr::OcrRegistry;

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub max_image_bytes: usize,
    pub default_ocr_provider: String,
    pub dev_mode: DevModeConfig,
    pub ocr_registry: Arc<OcrRegistry>,
    pub identity_provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: &AppConfig,
        dev_mode: DevModeConfig,
        ocr_registry: Arc<OcrRegistry>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
            jwt_ttl_days: config.jwt_ttl_days,
            max_image_bytes: config.max_image_bytes,
            default_ocr_provider: config.default_ocr_provider.clone(),
            dev_mode,
            ocr_registry,
            identity_provider,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State with the mock OCR provider and email sign-in over `db`
    pub fn for_tests(db: SqlitePool) -> Self {
        use crate::services::identity::EmailIdentityProvider;

        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("test_secret_key".to_string()),
            _ => None,
        });
        Self::new(
            db,
            &config,
            DevModeConfig::default(),
            Arc::new(OcrRegistry::new()),
            Arc::new(EmailIdentityProvider),
        )
    }
}
