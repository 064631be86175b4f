//! Shared helpers for integration tests.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;
use wrengate::{ServerConfig, auth::CookieSettings, create_app, db::Database};

pub const TEST_SECRET: &[u8] = b"integration-test-secret-32-bytes!";

/// Create a test app backed by an in-memory database.
pub async fn test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        signing_secret: TEST_SECRET.to_vec(),
        access_ttl: std::time::Duration::from_secs(600),
        refresh_ttl: std::time::Duration::from_secs(900),
        cookies: CookieSettings::default(),
        no_signup: false,
        relaxed_rate_limits: true,
    };
    (create_app(&config), db)
}

/// POST a JSON body to a path, with optional Cookie header.
pub async fn post_json(
    app: Router,
    path: &str,
    body: Value,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// GET a path with optional Cookie header.
pub async fn get_with_cookie(app: Router, path: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extract Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Pull the value of a named cookie out of Set-Cookie headers.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies
        .iter()
        .filter(|c| c.starts_with(&prefix) && !c.contains("Max-Age=0"))
        .filter_map(|c| c.split(';').next())
        .map(|pair| pair[prefix.len()..].to_string())
        .next()
}

/// Check if cookies contain a token being cleared (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// Sign up and log in a user through the API.
/// Returns (access_token, refresh_token).
pub async fn signup_and_login(app: &Router, username: &str, password: &str) -> (String, String) {
    let signup = post_json(
        app.clone(),
        "/api/v0/users/signup",
        serde_json::json!({ "username": username, "password": password }),
        None,
    )
    .await;
    assert_eq!(signup.status(), StatusCode::CREATED);

    login(app, username, password).await
}

/// Log in an existing user through the API.
/// Returns (access_token, refresh_token).
pub async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let response = post_json(
        app.clone(),
        "/api/v0/users/login",
        serde_json::json!({ "username": username, "password": password }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

/// Build a Cookie header value carrying both tokens.
pub fn auth_cookies(access_token: &str, refresh_token: &str) -> String {
    format!(
        "access_token={}; refresh_token={}",
        access_token, refresh_token
    )
}
