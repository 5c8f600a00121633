// src/services/ocr.rs
//! Coupon image extraction
//!
//! An [`OcrProvider`] turns the bytes of a coupon photo into structured coupon
//! fields. Providers are looked up by name through the [`OcrRegistry`]; the
//! name comes from each user's settings.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};

pub const MOCK_PROVIDER: &str = "mock";
pub const GPT4O_PROVIDER: &str = "gpt4o";

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not configured: {0}")]
    NotConfigured(String),

    #[error("OCR request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),

    #[error("OCR request rejected: {0}")]
    Rejected(String),

    #[error("OCR rate limit exceeded")]
    RateLimitExceeded,
}

impl OcrError {
    /// Transport failures, server errors and throttling may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, OcrError::RequestFailed(_) | OcrError::RateLimitExceeded)
    }
}

/// Fields read off a coupon image. Anything the provider could not see is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedCoupon {
    pub code: Option<String>,
    pub title: Option<String>,
    pub provider: Option<String>,
    pub discount: Option<String>,
    pub terms: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Registry name of this provider
    fn name(&self) -> &str;

    /// Extract coupon fields from raw image bytes
    async fn extract(&self, image: &[u8]) -> Result<ExtractedCoupon, OcrError>;
}

/// Stand-in provider that never looks at the pixels
///
/// The code is derived from the image bytes so the same photo always yields
/// the same code.
#[derive(Debug, Default, Clone)]
pub struct MockOcr {
    fixed_now: Option<DateTime<Utc>>,
}

impl MockOcr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock whose expiry and deadline are computed from a fixed instant
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            fixed_now: Some(now),
        }
    }

    pub fn code_for(image: &[u8]) -> String {
        let mut hasher = DefaultHasher::new();
        image.hash(&mut hasher);
        format!("MOCK{:04}", hasher.finish() % 10_000)
    }
}

#[async_trait]
impl OcrProvider for MockOcr {
    fn name(&self) -> &str {
        MOCK_PROVIDER
    }

    async fn extract(&self, image: &[u8]) -> Result<ExtractedCoupon, OcrError> {
        let now = self.fixed_now.unwrap_or_else(Utc::now);
        debug!(image_bytes = image.len(), "Mock OCR extraction");

        Ok(ExtractedCoupon {
            code: Some(Self::code_for(image)),
            title: Some("Mock Coupon from Image".to_string()),
            provider: Some("TestMerchant".to_string()),
            discount: Some("15% off".to_string()),
            terms: Some("Valid on purchases over $50".to_string()),
            expiry_date: Some(now + Duration::days(30)),
            deadline: Some(now + Duration::days(25)),
        })
    }
}

/// Name-indexed set of OCR providers
pub struct OcrRegistry {
    providers: BTreeMap<String, Arc<dyn OcrProvider>>,
    fallback: Arc<dyn OcrProvider>,
}

impl Default for OcrRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrRegistry {
    /// Registry holding only the mock provider
    pub fn new() -> Self {
        let fallback: Arc<dyn OcrProvider> = Arc::new(MockOcr::new());
        let mut providers = BTreeMap::new();
        providers.insert(MOCK_PROVIDER.to_string(), fallback.clone());
        Self {
            providers,
            fallback,
        }
    }

    /// Register a provider under its own name, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn OcrProvider>) {
        let name = provider.name().to_string();
        debug!(provider = %name, "Registering OCR provider");
        self.providers.insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Known provider names, sorted
    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Provider for `name`, or the mock provider when it is not registered
    pub fn resolve(&self, name: &str) -> Arc<dyn OcrProvider> {
        match self.get(name) {
            Some(provider) => provider,
            None => {
                warn!(
                    requested = %name,
                    fallback = %self.fallback.name(),
                    "OCR provider not available, falling back"
                );
                self.fallback.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FailingOcr;

    #[async_trait]
    impl OcrProvider for FailingOcr {
        fn name(&self) -> &str {
            "failing"
        }

        async fn extract(&self, _image: &[u8]) -> Result<ExtractedCoupon, OcrError> {
            Err(OcrError::RequestFailed("boom".to_string()))
        }
    }

    #[tokio::test]
    async fn test_mock_ocr_fields() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let extracted = MockOcr::at(now).extract(b"frame").await.unwrap();

        assert_eq!(extracted.title.as_deref(), Some("Mock Coupon from Image"));
        assert_eq!(extracted.provider.as_deref(), Some("TestMerchant"));
        assert_eq!(extracted.discount.as_deref(), Some("15% off"));
        assert_eq!(extracted.expiry_date, Some(now + Duration::days(30)));
        assert_eq!(extracted.deadline, Some(now + Duration::days(25)));
    }

    #[tokio::test]
    async fn test_mock_code_is_stable_per_image() {
        let ocr = MockOcr::new();
        let first = ocr.extract(b"same-bytes").await.unwrap().code.unwrap();
        let second = ocr.extract(b"same-bytes").await.unwrap().code.unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("MOCK"));
        assert_eq!(first.len(), 8);
        assert!(first[4..].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_registry_resolves_and_falls_back() {
        let mut registry = OcrRegistry::new();
        assert_eq!(registry.names(), vec!["mock".to_string()]);
        assert!(!registry.contains("failing"));

        registry.register(Arc::new(FailingOcr));
        assert!(registry.contains("failing"));
        assert_eq!(registry.resolve("failing").name(), "failing");
        assert!(registry.resolve("failing").extract(b"x").await.is_err());

        assert_eq!(registry.resolve(GPT4O_PROVIDER).name(), MOCK_PROVIDER);
        assert!(registry.get("nope").is_none());
    }
}
