pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod refresh;
pub mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware};
use tokio::net::TcpListener;

use api::create_api_router;
use auth::{CookieSettings, attach_issued_token};
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use refresh::RefreshTokenService;
use session::SessionService;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Raw HS256 signing secret (already base64-decoded)
    pub signing_secret: Vec<u8>,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// Cookie naming and attribute policy
    pub cookies: CookieSettings,
    /// Whether new user signups are disabled
    pub no_signup: bool,
    /// Use effectively-unlimited rate limits (tests only)
    pub relaxed_rate_limits: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.signing_secret, config.access_ttl));
    let refresh = RefreshTokenService::new(config.db.clone(), config.refresh_ttl);
    let session = SessionService::new(config.db.clone(), jwt.clone(), refresh.clone());

    let rate_limit_config = Arc::new(if config.relaxed_rate_limits {
        RateLimitConfig::relaxed()
    } else {
        RateLimitConfig::new()
    });

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        refresh,
        session,
        config.cookies.clone(),
        config.no_signup,
        rate_limit_config,
    )
    // Attaches tokens minted mid-request by the silent refresh path.
    .layer(middleware::from_fn(attach_issued_token));

    Router::new().nest("/api/v0", api_router)
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(config: &ServerConfig) {
    let refresh = RefreshTokenService::new(config.db.clone(), config.refresh_ttl);
    cleanup::run_cleanup(&refresh).await;
    cleanup::spawn_cleanup_scheduler(refresh);
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> std::io::Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    init_cleanup(&config).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
