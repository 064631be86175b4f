//! Tests for signup, login, and role-gated endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use wrengate::{ServerConfig, auth::CookieSettings, create_app, db::Database, password};

use common::*;

// =============================================================================
// Signup tests
// =============================================================================

#[tokio::test]
async fn test_signup_validation() {
    let (app, _db) = test_app().await;

    let cases = [
        (json!({ "username": "", "password": "password123" }), "empty username"),
        (
            json!({ "username": "a".repeat(33), "password": "password123" }),
            "over-long username",
        ),
        (
            json!({ "username": "has spaces", "password": "password123" }),
            "invalid characters",
        ),
        (json!({ "username": "alice", "password": "short" }), "short password"),
    ];

    for (body, label) in cases {
        let response = post_json(app.clone(), "/api/v0/users/signup", body, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", label);
    }
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let (app, _db) = test_app().await;
    signup_and_login(&app, "alice", "password123").await;

    let response = post_json(
        app,
        "/api/v0/users/signup",
        json!({ "username": "alice", "password": "different-password" }),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_stores_hash_not_plaintext() {
    let (app, db) = test_app().await;
    signup_and_login(&app, "alice", "password123").await;

    let user = db.users().get_by_username("alice").await.unwrap().unwrap();
    assert_ne!(user.password_hash, "password123");
    assert!(password::verify("password123", &user.password_hash));
}

#[tokio::test]
async fn test_no_signup_disables_endpoint() {
    let db = Database::open(":memory:").await.unwrap();
    let config = ServerConfig {
        db: db.clone(),
        signing_secret: TEST_SECRET.to_vec(),
        access_ttl: std::time::Duration::from_secs(600),
        refresh_ttl: std::time::Duration::from_secs(900),
        cookies: CookieSettings::default(),
        no_signup: true,
        relaxed_rate_limits: true,
    };
    let app = create_app(&config);

    let response = post_json(
        app.clone(),
        "/api/v0/users/signup",
        json!({ "username": "alice", "password": "password123" }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Login still works for accounts created out of band.
    let hashed = password::hash("password123").unwrap();
    db.users().create("alice", &hashed).await.unwrap();
    login(&app, "alice", "password123").await;
}

// =============================================================================
// Login tests
// =============================================================================

#[tokio::test]
async fn test_login_sets_both_cookies() {
    let (app, _db) = test_app().await;
    post_json(
        app.clone(),
        "/api/v0/users/signup",
        json!({ "username": "alice", "password": "password123" }),
        None,
    )
    .await;

    let response = post_json(
        app,
        "/api/v0/users/login",
        json!({ "username": "alice", "password": "password123" }),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = extract_set_cookies(&response);
    let access = cookie_value(&cookies, "access_token").expect("access cookie");
    let refresh = cookie_value(&cookies, "refresh_token").expect("refresh cookie");
    for cookie in &cookies {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
    }

    // Body carries the same values for header-based clients.
    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["access_token"], access.as_str());
    assert_eq!(body["refresh_token"], refresh.as_str());
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let (app, _db) = test_app().await;
    signup_and_login(&app, "alice", "password123").await;

    let response = post_json(
        app,
        "/api/v0/users/login",
        json!({ "username": "alice", "password": "wrong-password" }),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_unknown_user_same_response_as_wrong_password() {
    let (app, _db) = test_app().await;
    signup_and_login(&app, "alice", "password123").await;

    let wrong_password = post_json(
        app.clone(),
        "/api/v0/users/login",
        json!({ "username": "alice", "password": "wrong-password" }),
        None,
    )
    .await;
    let unknown_user = post_json(
        app,
        "/api/v0/users/login",
        json!({ "username": "nobody", "password": "whatever123" }),
        None,
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(wrong_password).await,
        body_json(unknown_user).await
    );
}

#[tokio::test]
async fn test_disabled_account_cannot_login() {
    let (app, db) = test_app().await;
    signup_and_login(&app, "alice", "password123").await;
    let user = db.users().get_by_username("alice").await.unwrap().unwrap();
    db.users().set_enabled(user.id, false).await.unwrap();

    let response = post_json(
        app,
        "/api/v0/users/login",
        json!({ "username": "alice", "password": "password123" }),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Admin endpoint tests
// =============================================================================

async fn create_admin(db: &Database, username: &str, raw_password: &str) {
    let hashed = password::hash(raw_password).unwrap();
    db.users().create_admin(username, &hashed).await.unwrap();
}

#[tokio::test]
async fn test_admin_endpoints_require_admin_role() {
    let (app, db) = test_app().await;
    create_admin(&db, "root", "admin-password").await;
    let (user_access, _) = signup_and_login(&app, "alice", "password123").await;
    let (admin_access, _) = login(&app, "root", "admin-password").await;

    // Unauthenticated: 401.
    let response = get_with_cookie(app.clone(), "/api/v0/admin/users", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Authenticated but not admin: 403.
    let response = get_with_cookie(
        app.clone(),
        "/api/v0/admin/users",
        Some(&format!("access_token={}", user_access)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin: 200 with the user list.
    let response = get_with_cookie(
        app,
        "/api/v0/admin/users",
        Some(&format!("access_token={}", admin_access)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let usernames: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert!(usernames.contains(&"root"));
    assert!(usernames.contains(&"alice"));
}

#[tokio::test]
async fn test_admin_dashboard() {
    let (app, db) = test_app().await;
    create_admin(&db, "root", "admin-password").await;
    signup_and_login(&app, "alice", "password123").await;
    let (admin_access, _) = login(&app, "root", "admin-password").await;

    let response = get_with_cookie(
        app,
        "/api/v0/admin/dashboard",
        Some(&format!("access_token={}", admin_access)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "root");
    assert_eq!(body["user_count"], 2);
}

#[tokio::test]
async fn test_admin_token_carries_both_roles() {
    let (app, db) = test_app().await;
    create_admin(&db, "root", "admin-password").await;
    let (admin_access, _) = login(&app, "root", "admin-password").await;

    let response = get_with_cookie(
        app,
        "/api/v0/users/me",
        Some(&format!("access_token={}", admin_access)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let roles = body["roles"].as_array().unwrap();
    assert!(roles.contains(&"ROLE_ADMIN".into()));
    assert!(roles.contains(&"ROLE_USER".into()));
    let privileges = body["privileges"].as_array().unwrap();
    assert!(privileges.contains(&"USER_MANAGE".into()));
    assert!(privileges.contains(&"PROFILE_READ".into()));
}
