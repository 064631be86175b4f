//! Token transport: cookie parsing, bearer headers, Set-Cookie building.

use axum::http::{HeaderMap, header};

/// Default cookie name for the access token.
pub const DEFAULT_ACCESS_COOKIE: &str = "access_token";

/// Default cookie name for the refresh token.
pub const DEFAULT_REFRESH_COOKIE: &str = "refresh_token";

/// Request header carrying a refresh token for clients that do not use
/// cookies. The cookie takes precedence when both are present.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract a bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim)
}

/// Cookie naming and attribute policy, shared between issuance and
/// resolution so the two can never drift apart.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub access_name: String,
    pub refresh_name: String,
    /// Set the Secure attribute (true behind HTTPS in production)
    pub secure: bool,
}

impl CookieSettings {
    pub fn new(access_name: String, refresh_name: String, secure: bool) -> Self {
        Self {
            access_name,
            refresh_name,
            secure,
        }
    }

    /// Build a Set-Cookie value: HttpOnly, SameSite=Strict, Path=/,
    /// Max-Age matching the token's own TTL.
    pub fn build(&self, name: &str, value: &str, max_age_secs: u64) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
            name,
            value,
            max_age_secs,
            self.secure_suffix()
        )
    }

    /// Build a Set-Cookie value that clears a cookie.
    pub fn clear(&self, name: &str) -> String {
        format!(
            "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
            name,
            self.secure_suffix()
        )
    }

    fn secure_suffix(&self) -> &'static str {
        if self.secure { "; Secure" } else { "" }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_ACCESS_COOKIE.to_string(),
            DEFAULT_REFRESH_COOKIE.to_string(),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("access_token=abc123"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; access_token=abc123; refresh_token=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "refresh_token"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, "access_token"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  access_token = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "access_token"), Some("abc123"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer eyJ.abc.def"),
        );

        assert_eq!(bearer_token(&headers), Some("eyJ.abc.def"));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let settings = CookieSettings::default();
        let cookie = settings.build("access_token", "tok", 600);
        assert_eq!(
            cookie,
            "access_token=tok; HttpOnly; SameSite=Strict; Path=/; Max-Age=600"
        );

        let secure = CookieSettings::new("a".into(), "r".into(), true);
        assert!(secure.build("a", "tok", 600).ends_with("; Secure"));
        assert!(secure.clear("a").contains("Max-Age=0"));
    }
}
