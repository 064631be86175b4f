mod admin;
mod error;
mod tokens;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::CookieSettings;
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;
use crate::refresh::RefreshTokenService;
use crate::session::SessionService;

pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    refresh: RefreshTokenService,
    session: SessionService,
    cookies: CookieSettings,
    no_signup: bool,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let users_state = users::UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        refresh: refresh.clone(),
        session: session.clone(),
        cookies: cookies.clone(),
        no_signup,
        rate_limit_config,
    };

    let tokens_state = tokens::TokensState {
        db: db.clone(),
        jwt: jwt.clone(),
        refresh: refresh.clone(),
        session,
        cookies: cookies.clone(),
    };

    let admin_state = admin::AdminState {
        db,
        jwt,
        refresh,
        cookies,
    };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/tokens", tokens::router(tokens_state))
        .nest("/admin", admin::router(admin_state))
}
