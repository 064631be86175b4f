//! User account API endpoints.
//!
//! - POST `/signup` - Sign up a new account
//! - POST `/login` - Establish a session (sets both token cookies)
//! - GET `/me` - Current principal's profile

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{CookieSettings, ProfileRead, RequirePrivilege};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};
use crate::refresh::RefreshTokenService;
use crate::session::SessionService;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub refresh: RefreshTokenService,
    pub session: SessionService,
    pub cookies: CookieSettings,
    pub no_signup: bool,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    let me_router = Router::new()
        .route("/me", get(me))
        .with_state(state.clone());

    let base = Router::new().merge(login_router).merge(me_router);

    if state.no_signup {
        base
    } else {
        let signup_router = Router::new()
            .route("/signup", post(signup))
            .with_state(state.clone())
            .layer(middleware::from_fn_with_state(
                state.rate_limit_config,
                rate_limit_signup,
            ));
        base.merge(signup_router)
    }
}

#[derive(Deserialize)]
struct SignupRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct SignupResponse {
    username: String,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }
    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

async fn signup(
    State(state): State<UsersState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    validate_username(username)?;

    if payload.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    state.session.signup(username, &payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            username: username.to_string(),
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

/// Tokens are returned in the body for bearer-header clients and set as
/// cookies for browser clients; both carry the same values.
#[derive(Serialize)]
struct LoginResponse {
    username: String,
    access_token: String,
    refresh_token: String,
    access_expires_at: u64,
    refresh_expires_at: i64,
}

async fn login(
    State(state): State<UsersState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .session
        .login(payload.username.trim(), &payload.password)
        .await?;

    let access_cookie = state.cookies.build(
        &state.cookies.access_name,
        &outcome.access.token,
        outcome.access.max_age_secs,
    );
    let refresh_cookie = state.cookies.build(
        &state.cookies.refresh_name,
        &outcome.refresh.token_value,
        outcome.refresh_max_age_secs,
    );

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(LoginResponse {
            username: outcome.username,
            access_token: outcome.access.token,
            refresh_token: outcome.refresh.token_value,
            access_expires_at: outcome.access.expires_at,
            refresh_expires_at: outcome.refresh.expires_at,
        }),
    ))
}

#[derive(Serialize)]
struct MeResponse {
    username: String,
    roles: Vec<String>,
    privileges: Vec<String>,
}

async fn me(RequirePrivilege(principal, _): RequirePrivilege<ProfileRead>) -> impl IntoResponse {
    Json(MeResponse {
        username: principal.subject,
        roles: principal.roles.into_iter().collect(),
        privileges: principal.privileges.into_iter().collect(),
    })
}
