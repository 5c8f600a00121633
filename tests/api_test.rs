use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use coupon_api::build_router;
use coupon_api::common::dev_mode::DevModeConfig;
use coupon_api::common::{migrations, AppConfig, AppState};
use coupon_api::services::{EmailIdentityProvider, OcrRegistry};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

// ─── Test helpers ───────────────────────────────────────────────────────

const PNG_1X1: [u8; 24] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R', 0, 0, 0,
    1, 0, 0, 0, 1,
];

async fn test_app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    migrations::create_tables(&pool).await.expect("schema");

    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration_secret".to_string()),
        _ => None,
    });
    let state = AppState::new(
        pool,
        &config,
        DevModeConfig::default(),
        Arc::new(OcrRegistry::new()),
        Arc::new(EmailIdentityProvider),
    );

    build_router(Arc::new(RwLock::new(state)), &config.cors_origins)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "name": "Tester" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_fallback() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = send(&app, Method::GET, "/api/test-auth", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cors"], "enabled");

    let (status, body) = send(&app, Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/coupons", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/api/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_login_rejects_missing_email() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::POST, "/api/auth/login", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_coupon_lifecycle() {
    let app = test_app().await;
    let token = login(&app, "shopper@example.com").await;

    let (status, me) = send(&app, Method::GET, "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "shopper@example.com");

    let (status, settings) = send(&app, Method::GET, "/api/settings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["ocrProvider"], "mock");
    assert_eq!(settings["notifyBeforeExpiry"], 3);

    // Capture
    let image = format!("data:image/png;base64,{}", BASE64.encode(PNG_1X1));
    let (status, created) = send(
        &app,
        Method::POST,
        "/api/coupons",
        Some(&token),
        Some(json!({ "image": image })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", created);
    assert_eq!(created["claimed"], false);
    assert_eq!(created["title"], "Mock Coupon from Image");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, list) = send(&app, Method::GET, "/api/coupons", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Claim
    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/api/coupons/{}", id),
        Some(&token),
        Some(json!({ "claimed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["claimed"], true);

    let (status, summary) =
        send(&app, Method::GET, "/api/coupons/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summary,
        json!({ "total": 1, "active": 0, "expired": 0, "claimed": 1 })
    );

    // Delete
    let uri = format!("/api/coupons/{}", id);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Coupon deleted");

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_capture_rejects_non_images() {
    let app = test_app().await;
    let token = login(&app, "shopper@example.com").await;

    let (status, body) = send(&app, Method::POST, "/api/coupons", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image provided");

    let text = BASE64.encode(b"definitely not a picture");
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/coupons",
        Some(&token),
        Some(json!({ "image": text })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_users_cannot_touch_each_others_coupons() {
    let app = test_app().await;
    let alice = login(&app, "alice@example.com").await;
    let bob = login(&app, "bob@example.com").await;

    let image = BASE64.encode(PNG_1X1);
    let (_, created) = send(
        &app,
        Method::POST,
        "/api/coupons",
        Some(&alice),
        Some(json!({ "image": image })),
    )
    .await;
    let uri = format!("/api/coupons/{}", created["id"].as_str().unwrap());

    let (_, bobs) = send(&app, Method::GET, "/api/coupons", Some(&bob), None).await;
    assert!(bobs.as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&bob),
        Some(json!({ "claimed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, alices) = send(&app, Method::GET, "/api/coupons", Some(&alice), None).await;
    assert_eq!(alices[0]["claimed"], false);
}

#[tokio::test]
async fn test_settings_validation() {
    let app = test_app().await;
    let token = login(&app, "settings@example.com").await;

    let (status, updated) = send(
        &app,
        Method::POST,
        "/api/settings",
        Some(&token),
        Some(json!({ "autoDeleteClaimed": true, "notifyBeforeExpiry": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["autoDeleteClaimed"], true);
    assert_eq!(updated["notifyBeforeExpiry"], 7);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/settings",
        Some(&token),
        Some(json!({ "notifyBeforeExpiry": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/settings",
        Some(&token),
        Some(json!({ "ocrProvider": "gpt4o" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
