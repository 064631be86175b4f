//! The per-request authentication decision procedure.
//!
//! One attempt per request: absent or unverifiable tokens degrade to
//! "unauthenticated", a valid token yields a `Principal`, and an expired
//! but authentic token triggers the silent refresh path. A token minted
//! mid-request travels back on the response through the same transport
//! the stale token arrived on.

use std::cell::RefCell;
use std::marker::PhantomData;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::Response,
};

use super::cookie::{REFRESH_TOKEN_HEADER, bearer_token, get_cookie};
use super::errors::AuthRejection;
use super::state::HasAuthBackend;
use super::types::Principal;
use crate::jwt::TokenError;
use crate::refresh::RefreshError;

/// Response header carrying a silently minted access token back to
/// clients that sent the stale token as a bearer header.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// How the access token candidate reached us; the replacement follows the
/// same route back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Bearer,
    Cookie,
}

/// A minted token staged for attachment to the outgoing response.
#[derive(Debug, Clone)]
enum StagedToken {
    SetCookie(String),
    Header(String),
}

tokio::task_local! {
    /// Hand-off slot between the gate (which runs during extraction) and
    /// the response middleware (which owns the response headers).
    static STAGED_ACCESS_TOKEN: RefCell<Option<StagedToken>>;
}

/// Middleware that attaches a silently minted access token to the
/// response. Must wrap every router that uses the auth extractors.
pub async fn attach_issued_token(request: Request, next: Next) -> Response {
    STAGED_ACCESS_TOKEN
        .scope(RefCell::new(None), async move {
            let mut response = next.run(request).await;
            let staged = STAGED_ACCESS_TOKEN.with(|cell| cell.borrow_mut().take());
            match staged {
                Some(StagedToken::SetCookie(cookie)) => {
                    if let Ok(value) = HeaderValue::from_str(&cookie) {
                        response.headers_mut().append(SET_COOKIE, value);
                    }
                }
                Some(StagedToken::Header(token)) => {
                    if let Ok(value) = HeaderValue::from_str(&token) {
                        response.headers_mut().append(ACCESS_TOKEN_HEADER, value);
                    }
                }
                None => {}
            }
            response
        })
        .await
}

fn stage_token(token: StagedToken) {
    let _ = STAGED_ACCESS_TOKEN.try_with(|cell| {
        cell.borrow_mut().replace(token);
    });
}

/// Run the authentication decision procedure for a request.
///
/// Returns `Ok(None)` for every recoverable failure (no token, malformed,
/// bad signature, dead refresh token, owner mismatch); the access-control
/// decision belongs to the caller. Only a store failure is an error, and
/// it fails closed.
pub async fn authenticate_request<S>(
    parts: &mut Parts,
    state: &S,
) -> Result<Option<Principal>, AuthRejection>
where
    S: HasAuthBackend + Send + Sync,
{
    // Idempotent short-circuit: one attempt per request.
    if let Some(principal) = parts.extensions.get::<Principal>() {
        return Ok(Some(principal.clone()));
    }

    // Bearer header preferred, cookie fallback.
    let candidate = bearer_token(&parts.headers)
        .map(|t| (t, Transport::Bearer))
        .or_else(|| {
            get_cookie(&parts.headers, &state.cookies().access_name)
                .map(|t| (t, Transport::Cookie))
        });
    let Some((access_token, transport)) = candidate else {
        return Ok(None);
    };

    let expired_claims = match state.jwt().verify_access(access_token) {
        Ok(claims) => {
            let principal = Principal::from(claims);
            parts.extensions.insert(principal.clone());
            return Ok(Some(principal));
        }
        Err(TokenError::Expired) => {
            // Expiry is checked after the signature, so the claims in the
            // stale token are authentic and the subject is trustworthy.
            match state.jwt().decode_expired(access_token) {
                Ok(claims) => claims,
                Err(_) => return Ok(None),
            }
        }
        // Tampered or garbage: indistinguishable from absent.
        Err(_) => return Ok(None),
    };

    silent_refresh(parts, state, &expired_claims.sub, transport).await
}

/// The silent refresh path: exchange a live refresh token for a new
/// access token without the client noticing. Never mutates store state on
/// a failed validation.
async fn silent_refresh<S>(
    parts: &mut Parts,
    state: &S,
    subject: &str,
    transport: Transport,
) -> Result<Option<Principal>, AuthRejection>
where
    S: HasAuthBackend + Send + Sync,
{
    let refresh_value = get_cookie(&parts.headers, &state.cookies().refresh_name).or_else(|| {
        parts
            .headers
            .get(REFRESH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
    });
    let Some(refresh_value) = refresh_value else {
        return Ok(None);
    };

    let record = match state.refresh().validate(refresh_value).await {
        Ok(record) => record,
        Err(RefreshError::Store(e)) => {
            tracing::error!(error = %e, "Refresh token store unavailable");
            return Err(AuthRejection::store_unavailable());
        }
        Err(_) => return Ok(None),
    };

    // Re-fetch the live user record: claims for the replacement token
    // reflect current roles/privileges, not the stale token's copy.
    let user = match state.db().users().get_by_username(subject).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(None),
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed during refresh");
            return Err(AuthRejection::store_unavailable());
        }
    };

    if !user.enabled {
        return Ok(None);
    }

    // Cross-owner rejection: a refresh token only renews its own owner's
    // session, however valid it is otherwise.
    if record.user_id != user.id {
        tracing::warn!(subject = %subject, "Refresh token owner mismatch");
        return Ok(None);
    }

    let issued = match state
        .jwt()
        .issue_access(&user.username, &user.roles, &user.privileges)
    {
        Ok(issued) => issued,
        Err(e) => {
            tracing::error!(error = %e, "Failed to mint access token");
            return Ok(None);
        }
    };

    let staged = match transport {
        Transport::Cookie => StagedToken::SetCookie(state.cookies().build(
            &state.cookies().access_name,
            &issued.token,
            issued.max_age_secs,
        )),
        Transport::Bearer => StagedToken::Header(issued.token.clone()),
    };
    stage_token(staged);

    let principal = Principal {
        subject: user.username,
        roles: user.roles,
        privileges: user.privileges,
    };
    parts.extensions.insert(principal.clone());
    Ok(Some(principal))
}

// =============================================================================
// Extractors
// =============================================================================

/// Requires an authenticated principal; any role will do.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await?
            .map(Auth)
            .ok_or_else(AuthRejection::unauthenticated)
    }
}

/// Requires an authenticated principal holding ROLE_ADMIN.
pub struct AdminOnly(pub Principal);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = authenticate_request(parts, state)
            .await?
            .ok_or_else(AuthRejection::unauthenticated)?;

        if !principal.has_role("ROLE_ADMIN") {
            return Err(AuthRejection::forbidden());
        }
        Ok(AdminOnly(principal))
    }
}

/// Privilege names that can gate a route.
///
/// Authorization keys on privileges rather than roles where possible:
/// roles are bundles, privileges are the actual capabilities the claims
/// carry.
pub trait Privilege {
    const NAME: &'static str;
}

/// Read access to one's own profile data.
pub struct ProfileRead;

impl Privilege for ProfileRead {
    const NAME: &'static str = "PROFILE_READ";
}

/// Administrative management of user accounts.
pub struct UserManage;

impl Privilege for UserManage {
    const NAME: &'static str = "USER_MANAGE";
}

/// Requires an authenticated principal holding the privilege `P`.
pub struct RequirePrivilege<P: Privilege>(pub Principal, pub PhantomData<P>);

impl<S, P> FromRequestParts<S> for RequirePrivilege<P>
where
    S: HasAuthBackend + Send + Sync,
    P: Privilege,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = authenticate_request(parts, state)
            .await?
            .ok_or_else(AuthRejection::unauthenticated)?;

        if !principal.has_privilege(P::NAME) {
            return Err(AuthRejection::forbidden());
        }
        Ok(RequirePrivilege(principal, PhantomData))
    }
}
