//! Token management API endpoints.
//!
//! - GET `/verify` - Check that the current access token is valid
//! - POST `/refresh` - Exchange refresh token for new access token
//! - POST `/logout` - Revoke refresh token and clear cookies

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE, request::Parts},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, CookieSettings, REFRESH_TOKEN_HEADER, get_cookie};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::refresh::{RefreshError, RefreshTokenService};
use crate::session::SessionService;

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub refresh: RefreshTokenService,
    pub session: SessionService,
    pub cookies: CookieSettings,
}

impl_has_auth_backend!(TokensState);

pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/verify", get(verify_token))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Verify that the current access token is still valid.
/// Returns 200 if valid, 401 if not.
async fn verify_token(Auth(_principal): Auth) -> impl IntoResponse {
    StatusCode::OK
}

/// Pull the refresh token from the cookie, falling back to the header for
/// non-browser clients.
fn refresh_value<'a>(parts: &'a Parts, cookies: &CookieSettings) -> Option<&'a str> {
    get_cookie(&parts.headers, &cookies.refresh_name).or_else(|| {
        parts
            .headers
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
    })
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
    access_expires_at: u64,
}

/// Exchange a valid refresh token for a new access token.
///
/// The explicit counterpart of the silent path: clients that would rather
/// renew proactively than send a stale token call this directly. The
/// refresh token itself is not rotated.
async fn refresh_token(
    State(state): State<TokensState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    let token_value = refresh_value(&parts, &state.cookies)
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    let record = match state.refresh.validate(token_value).await {
        Ok(record) => record,
        Err(RefreshError::Store(e)) => {
            return Err(ApiError::db_error("Failed to validate refresh token", e));
        }
        Err(_) => return Err(ApiError::unauthorized("Invalid or expired refresh token")),
    };

    // Claims come from the live user record, not from any old token.
    let user = state
        .db
        .users()
        .get_by_id(record.user_id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    if !user.enabled {
        return Err(ApiError::forbidden("Account is disabled"));
    }

    let issued = state
        .jwt
        .issue_access(&user.username, &user.roles, &user.privileges)
        .map_err(|e| {
            error!("Failed to mint access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    let access_cookie = state.cookies.build(
        &state.cookies.access_name,
        &issued.token,
        issued.max_age_secs,
    );

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, access_cookie)],
        Json(RefreshResponse {
            access_token: issued.token,
            access_expires_at: issued.expires_at,
        }),
    ))
}

/// Logout - revoke the refresh token and clear both cookies.
///
/// Idempotent: an absent, unknown, or already-revoked token still yields
/// a successful logout.
async fn logout(
    State(state): State<TokensState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    if let Some(token_value) = refresh_value(&parts, &state.cookies) {
        state.session.logout(token_value).await?;
    }

    let clear_access = state.cookies.clear(&state.cookies.access_name);
    let clear_refresh = state.cookies.clear(&state.cookies.refresh_name);

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, clear_access), (SET_COOKIE, clear_refresh)]),
        Json(serde_json::json!({ "success": true })),
    ))
}
