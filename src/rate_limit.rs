//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force attacks.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

/// Per-IP rate limiter for endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for login attempts (strict: burst of 5, then 1 per second)
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for signups (strict: 3 per minute)
    pub signup: Arc<IpLimiter>,
}

impl RateLimitConfig {
    /// Create rate limiters with production limits.
    pub fn new() -> Self {
        Self::with_limits(1, 5, 3)
    }

    /// Create rate limiters that effectively never trip. Used by tests
    /// that hammer the login endpoint.
    pub fn relaxed() -> Self {
        Self::with_limits(1000, 1000, 1000)
    }

    fn with_limits(login_per_sec: u32, login_burst: u32, signup_per_min: u32) -> Self {
        Self {
            // Login: sustained 1/s with a burst of 5 per IP (prevents brute force)
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(NonZeroU32::new(login_per_sec).unwrap_or(NonZeroU32::MIN))
                    .allow_burst(NonZeroU32::new(login_burst).unwrap_or(NonZeroU32::MIN)),
            )),
            // Signup: 3 per minute per IP (prevents spam)
            signup: Arc::new(RateLimiter::keyed(Quota::per_minute(
                NonZeroU32::new(signup_per_min).unwrap_or(NonZeroU32::MIN),
            ))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the client IP: first entry of X-Forwarded-For when running
/// behind a proxy, otherwise the socket peer address.
fn client_ip(request: &Request) -> Option<String> {
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    if let Some(forwarded_for) = request.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(first_ip) = value.split(',').next() {
                let ip = first_ip.trim();
                if !ip.is_empty() {
                    return Some(ip.to_string());
                }
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    // No resolvable IP means no key to throttle on; in-process test
    // requests have neither a proxy header nor a socket peer.
    let Some(ip) = client_ip(&request) else {
        return next.run(request).await;
    };

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts. Please wait before trying again.",
        )
            .into_response(),
    }
}

/// Middleware for rate limiting signups.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = client_ip(&request) else {
        return next.run(request).await;
    };

    match config.signup.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many signup attempts. Please wait before trying again.",
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_limiter_trips_after_burst() {
        let config = RateLimitConfig::new();
        let ip = "203.0.113.9".to_string();

        for _ in 0..5 {
            assert!(config.login.check_key(&ip).is_ok());
        }
        assert!(config.login.check_key(&ip).is_err());

        // A different IP is unaffected.
        assert!(config.login.check_key(&"203.0.113.10".to_string()).is_ok());
    }

    #[test]
    fn test_relaxed_limiter_allows_bursts() {
        let config = RateLimitConfig::relaxed();
        let ip = "127.0.0.1".to_string();
        for _ in 0..100 {
            assert!(config.login.check_key(&ip).is_ok());
        }
    }
}
