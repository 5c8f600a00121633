// src/main.rs
use coupon_api::common::dev_mode::{apply_cli_override, print_dev_mode_status, DevModeConfig};
use coupon_api::common::{migrations, AppConfig, AppState};
use coupon_api::services::{EmailIdentityProvider, OcrRegistry, OpenAIConfig, OpenAIVisionOcr};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env();
    if config.uses_default_secret() {
        warn!("JWT_SECRET is not set; using the placeholder secret");
    }

    let dev_mode = apply_cli_override(DevModeConfig::from_env());
    print_dev_mode_status(&dev_mode);

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let mut ocr_registry = OcrRegistry::new();
    if let Some(api_key) = &config.openai_api_key {
        let openai_config = OpenAIConfig {
            base_url: config.openai_base_url.clone(),
            model: config.openai_model.clone(),
            ..OpenAIConfig::new(api_key.clone())
        };
        ocr_registry.register(Arc::new(OpenAIVisionOcr::new(openai_config)));
    }
    info!(providers = ?ocr_registry.names(), default = %config.default_ocr_provider, "OCR providers ready");

    if !ocr_registry.contains(&config.default_ocr_provider) {
        warn!(
            provider = %config.default_ocr_provider,
            "DEFAULT_OCR_PROVIDER is not registered; new users will fall back to mock"
        );
    }

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState::new(
        pool,
        &config,
        dev_mode,
        Arc::new(ocr_registry),
        Arc::new(EmailIdentityProvider),
    );
    let shared = Arc::new(RwLock::new(app_state));

    let app = coupon_api::build_router(shared, &config.cors_origins);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
