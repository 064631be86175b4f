//! Admin API endpoints.
//!
//! The dashboard requires ROLE_ADMIN; user management keys on the
//! USER_MANAGE privilege.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, CookieSettings, RequirePrivilege, UserManage};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::refresh::RefreshTokenService;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub refresh: RefreshTokenService,
    pub cookies: CookieSettings,
}

impl_has_auth_backend!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .with_state(state)
}

#[derive(Serialize)]
struct DashboardResponse {
    username: String,
    user_count: i64,
}

/// Admin landing data. Mostly exists so role gating has a cheap target.
async fn dashboard(
    State(state): State<AdminState>,
    AdminOnly(principal): AdminOnly,
) -> Result<impl IntoResponse, ApiError> {
    let user_count = state
        .db
        .users()
        .count()
        .await
        .db_err("Failed to count users")?;

    Ok(Json(DashboardResponse {
        username: principal.subject,
        user_count,
    }))
}

/// List all users. Gated on the privilege rather than the role: the
/// claims carry both, and USER_MANAGE is the capability this needs.
async fn list_users(
    State(state): State<AdminState>,
    RequirePrivilege(_principal, _): RequirePrivilege<UserManage>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;

    Ok(Json(users))
}
