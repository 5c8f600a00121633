//! Authentication handlers

use axum::extract::{Extension, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::extractors::AuthedUser;
use super::models::{Claims, LoginResponse, User, UserResponse};
use crate::common::{generate_user_id, safe_email_log, ApiError, AppState};
use crate::preferences::services::PreferencesService;
use crate::services::identity::{Identity, SignInRequest};

/// POST /api/auth/login
/// Signs a user in through the configured identity provider
///
/// The first login for an email creates the user together with a default
/// settings row; later logins reuse it.
///
/// # Request Body
/// ```json
/// { "email": "user@example.com", "name": "User" }
/// ```
///
/// # Response
/// ```json
/// { "access_token": "<jwt>", "user": { "id": "U_...", "email": "...", "name": "..." } }
/// ```
pub async fn login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let identity = state.identity_provider.sign_in(&payload).await?;
    debug!(
        email = %safe_email_log(&identity.email),
        provider = %state.identity_provider.name(),
        "Identity resolved, looking up user"
    );

    let user = match find_user_by_email(&state.db, &identity.email).await? {
        Some(user) => {
            debug!(user_id = %user.id, "Found existing user");
            user
        }
        None => {
            create_user(
                &state.db,
                &identity,
                state.identity_provider.name(),
                &state.default_ocr_provider,
            )
            .await?
        }
    };

    let access_token = issue_token(&user.id, &state.jwt_secret, state.jwt_ttl_days)?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User signed in"
    );

    Ok(Json(LoginResponse {
        access_token,
        user: user.into(),
    }))
}

/// GET /api/me
/// Returns the current authenticated user's information
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// POST /api/auth/logout
/// Tokens are stateless; the client drops its copy
pub async fn logout_handler(authed: AuthedUser) -> Json<serde_json::Value> {
    info!(user_id = %authed.id, "User logged out");
    Json(serde_json::json!({ "message": "Logged out" }))
}

/// Create a signed HS256 token for `user_id`
pub fn issue_token(user_id: &str, secret: &str, ttl_days: i64) -> Result<String, ApiError> {
    let exp = (Utc::now() + Duration::days(ttl_days)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        error!(error = %e, user_id = %user_id, "JWT encoding error");
        ApiError::InternalServer("jwt error".to_string())
    })
}

pub async fn find_user_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email.to_lowercase())
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub(super) async fn create_user(
    db: &SqlitePool,
    identity: &Identity,
    provider: &str,
    default_ocr_provider: &str,
) -> Result<User, ApiError> {
    let id = generate_user_id();
    info!(
        user_id = %id,
        email = %safe_email_log(&identity.email),
        provider = %provider,
        "Creating new user account"
    );

    // A concurrent first login for the same email may win the insert; both
    // callers then resolve to the stored row
    let result = sqlx::query(
        "INSERT OR IGNORE INTO users (id, email, name, provider, provider_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(identity.email.to_lowercase())
    .bind(&identity.name)
    .bind(provider)
    .bind(&identity.id)
    .execute(db)
    .await
    .map_err(|e| {
        error!(error = %e, user_id = %id, "Database error inserting new user");
        ApiError::DatabaseError(e)
    })?;

    let user = find_user_by_email(db, &identity.email)
        .await?
        .ok_or_else(|| ApiError::InternalServer("user row missing after insert".to_string()))?;

    if result.rows_affected() == 0 {
        debug!(user_id = %user.id, "User was created concurrently, reusing it");
    }

    PreferencesService::new(db.clone())
        .ensure_defaults(&user.id, default_ocr_provider)
        .await?;

    Ok(user)
}

/// Resolve the dev-mode user, creating its row on first use
///
/// An existing account with the dev email wins so coupons keep one owner.
pub async fn ensure_dev_user(
    db: &SqlitePool,
    dev_user: User,
    default_ocr_provider: &str,
) -> Result<User, ApiError> {
    if let Some(existing) = find_user_by_email(db, &dev_user.email).await? {
        return Ok(existing);
    }

    sqlx::query(
        "INSERT OR IGNORE INTO users (id, email, name, provider, provider_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&dev_user.id)
    .bind(dev_user.email.to_lowercase())
    .bind(&dev_user.name)
    .bind(&dev_user.provider)
    .bind(&dev_user.provider_id)
    .execute(db)
    .await?;

    PreferencesService::new(db.clone())
        .ensure_defaults(&dev_user.id, default_ocr_provider)
        .await?;

    Ok(dev_user)
}
