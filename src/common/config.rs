// src/common/config.rs
//! Server configuration loaded from environment variables (and `.env` via dotenv)

use std::env;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://coupons.db";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_JWT_TTL_DAYS: i64 = 30;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_days: i64,
    pub cors_origins: Vec<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub default_ocr_provider: String,
    pub max_image_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY");
        let default_ocr_provider = get("DEFAULT_OCR_PROVIDER").unwrap_or_else(|| {
            if openai_api_key.is_some() {
                "gpt4o".to_string()
            } else {
                "mock".to_string()
            }
        });

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            port: get("PORT")
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            jwt_secret: get("JWT_SECRET")
                .unwrap_or_else(|| "replace_with_strong_secret".to_string()),
            jwt_ttl_days: get("JWT_TTL_DAYS")
                .and_then(|d| d.parse::<i64>().ok())
                .filter(|d| *d > 0)
                .unwrap_or(DEFAULT_JWT_TTL_DAYS),
            cors_origins,
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            default_ocr_provider,
            max_image_bytes: get("MAX_IMAGE_BYTES")
                .and_then(|b| b.parse::<usize>().ok())
                .filter(|b| *b > 0)
                .unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
        }
    }

    /// True when the JWT secret is still the placeholder
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == "replace_with_strong_secret"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.port, 5000);
        assert_eq!(config.jwt_ttl_days, 30);
        assert_eq!(config.default_ocr_provider, "mock");
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_api_key_switches_default_provider() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]);
        assert_eq!(config.default_ocr_provider, "gpt4o");

        let pinned = config_from(&[("OPENAI_API_KEY", "sk-test"), ("DEFAULT_OCR_PROVIDER", "mock")]);
        assert_eq!(pinned.default_ocr_provider, "mock");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("JWT_TTL_DAYS", "-4"),
            ("MAX_IMAGE_BYTES", "0"),
            ("OPENAI_API_KEY", "   "),
        ]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.jwt_ttl_days, DEFAULT_JWT_TTL_DAYS);
        assert_eq!(config.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn test_cors_origins_are_trimmed() {
        let config = config_from(&[("CORS_ORIGINS", " https://a.example , ,https://b.example")]);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
