//! Request-path authentication.
//!
//! Dual-token system: short-lived signed access tokens (stateless) and
//! long-lived opaque refresh tokens (database-tracked, revocable). When an
//! access token arrives expired but authentic, the gate silently mints a
//! replacement if the paired refresh token is still valid and owned by the
//! same subject.
//!
//! Authentication here never rejects a request outright: every token
//! failure degrades to "unauthenticated" and the role-gated extractors
//! make the access-control decision. Only a backing store failure
//! surfaces, as a 500, so operators can tell "bad credentials" from
//! "dependency down".

mod cookie;
mod errors;
mod gate;
mod state;
mod types;

pub use cookie::{
    CookieSettings, DEFAULT_ACCESS_COOKIE, DEFAULT_REFRESH_COOKIE, REFRESH_TOKEN_HEADER,
    bearer_token, get_cookie,
};
pub use errors::AuthRejection;
pub use gate::{
    ACCESS_TOKEN_HEADER, AdminOnly, Auth, Privilege, ProfileRead, RequirePrivilege, UserManage,
    attach_issued_token, authenticate_request,
};
pub use state::HasAuthBackend;
pub use types::Principal;
