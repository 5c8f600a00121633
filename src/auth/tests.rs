//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - JWT token issuing and validation
//! - Login creating or reusing users
//! - Default settings row on first login

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::migrations::test_support::setup_test_db;
    use crate::common::{ApiError, AppState};
    use crate::services::identity::SignInRequest;
    use axum::extract::{Extension, Json};
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    async fn shared_state() -> Arc<RwLock<AppState>> {
        let pool = setup_test_db().await;
        Arc::new(RwLock::new(AppState::for_tests(pool)))
    }

    fn sign_in(email: &str, name: Option<&str>) -> Json<SignInRequest> {
        Json(SignInRequest {
            email: Some(email.to_string()),
            name: name.map(str::to_string),
        })
    }

    #[test]
    fn test_issue_token_round_trip() {
        let secret = "test_secret_key";
        let token = handlers::issue_token("U_ABC123", secret, 30).expect("Failed to issue token");

        let decoded = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .expect("Failed to decode token");

        assert_eq!(decoded.claims.sub, "U_ABC123");
        let now = chrono::Utc::now().timestamp() as usize;
        let thirty_days = 30 * 24 * 60 * 60;
        assert!(decoded.claims.exp > now + thirty_days - 60);
        assert!(decoded.claims.exp <= now + thirty_days + 60);
    }

    #[test]
    fn test_jwt_validation_fails_with_wrong_secret() {
        let token = handlers::issue_token("U_ABC123", "test_secret_key", 30).unwrap();

        let result = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret("wrong_secret_key".as_bytes()),
            &Validation::new(Algorithm::HS256),
        );

        assert!(
            result.is_err(),
            "Token validation should fail with wrong secret"
        );
    }

    #[tokio::test]
    async fn test_login_creates_user_and_settings() {
        let state = shared_state().await;

        let Json(response) = handlers::login(
            Extension(state.clone()),
            sign_in("New.User@Example.com", Some("New User")),
        )
        .await
        .unwrap();

        assert!(response.user.id.starts_with("U_"));
        assert_eq!(response.user.email, "new.user@example.com");
        assert_eq!(response.user.name.as_deref(), Some("New User"));
        assert!(!response.access_token.is_empty());

        let db = state.read().await.db.clone();
        let (settings_rows,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_settings WHERE user_id = ?")
                .bind(&response.user.id)
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(settings_rows, 1);
    }

    #[tokio::test]
    async fn test_login_reuses_existing_user() {
        let state = shared_state().await;

        let Json(first) = handlers::login(Extension(state.clone()), sign_in("a@example.com", None))
            .await
            .unwrap();
        let Json(second) = handlers::login(Extension(state.clone()), sign_in("A@example.com", None))
            .await
            .unwrap();

        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.name.as_deref(), Some("User"));
    }

    #[tokio::test]
    async fn test_create_user_after_losing_insert_race_reuses_row() {
        let state = shared_state().await;
        let db = state.read().await.db.clone();

        sqlx::query("INSERT INTO users (id, email, name) VALUES ('U_W1NNER', 'race@example.com', 'First')")
            .execute(&db)
            .await
            .unwrap();

        let identity = crate::services::identity::Identity {
            id: "email:race@example.com".to_string(),
            email: "race@example.com".to_string(),
            name: "Second".to_string(),
        };
        let user = handlers::create_user(&db, &identity, "email", "mock")
            .await
            .expect("losing insert should resolve to the stored user");

        assert_eq!(user.id, "U_W1NNER");
        let (settings_rows,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_settings WHERE user_id = 'U_W1NNER'")
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(settings_rows, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_logins_share_one_user() {
        let state = shared_state().await;

        let (first, second) = tokio::join!(
            handlers::login(Extension(state.clone()), sign_in("twin@example.com", None)),
            handlers::login(Extension(state.clone()), sign_in("twin@example.com", None)),
        );

        let Json(first) = first.unwrap();
        let Json(second) = second.unwrap();
        assert_eq!(first.user.id, second.user.id);
    }

    #[tokio::test]
    async fn test_login_without_email_is_bad_request() {
        let state = shared_state().await;

        let result = handlers::login(
            Extension(state),
            Json(SignInRequest {
                email: None,
                name: Some("Nobody".to_string()),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_dev_user_is_created_once() {
        let state = shared_state().await;
        let app_state = state.read().await.clone();

        let dev_user = app_state.dev_mode.create_dev_user();
        let first = handlers::ensure_dev_user(&app_state.db, dev_user.clone(), "mock")
            .await
            .unwrap();
        let second = handlers::ensure_dev_user(&app_state.db, dev_user, "mock")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let found = handlers::find_user_by_email(&app_state.db, "dev@test.com")
            .await
            .unwrap();
        assert!(found.is_some());
    }
}
