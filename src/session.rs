//! Login, logout, and signup orchestration.
//!
//! Login is the only place credentials are verified, and the only place a
//! refresh token is rotated besides logout. Silent refresh (auth::gate)
//! deliberately reuses the live refresh token.

use std::sync::Arc;

use crate::db::{Database, RefreshTokenRecord};
use crate::jwt::{IssuedAccess, JwtConfig};
use crate::password;
use crate::refresh::{RefreshError, RefreshTokenService};

/// Session-level failures.
///
/// `CredentialInvalid` covers unknown username and wrong password alike;
/// the distinction is never surfaced.
#[derive(Debug)]
pub enum SessionError {
    CredentialInvalid,
    AccountDisabled,
    UsernameTaken,
    /// Backing store failure; fail closed
    Store(sqlx::Error),
    /// Hashing, minting, or clock failure
    Internal(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::CredentialInvalid => write!(f, "Invalid username or password"),
            SessionError::AccountDisabled => write!(f, "Account is disabled"),
            SessionError::UsernameTaken => write!(f, "Username is already taken"),
            SessionError::Store(e) => write!(f, "Store error: {}", e),
            SessionError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::Store(e)
    }
}

impl From<RefreshError> for SessionError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::Store(e) => SessionError::Store(e),
            other => SessionError::Internal(other.to_string()),
        }
    }
}

/// Everything a successful login hands back to the transport layer.
#[derive(Debug)]
pub struct LoginOutcome {
    pub username: String,
    pub access: IssuedAccess,
    pub refresh: RefreshTokenRecord,
    /// Refresh cookie Max-Age, matching the record's TTL
    pub refresh_max_age_secs: u64,
}

/// Orchestrates session lifecycle on top of the user store, the token
/// codec, and the refresh token service.
#[derive(Clone)]
pub struct SessionService {
    db: Database,
    jwt: Arc<JwtConfig>,
    refresh: RefreshTokenService,
}

impl SessionService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, refresh: RefreshTokenService) -> Self {
        Self { db, jwt, refresh }
    }

    /// Verify credentials and establish a session: a fresh access token
    /// plus a rotated refresh token. Rotation revokes any prior active
    /// refresh record for the user, so at most one stays live.
    pub async fn login(&self, username: &str, raw_password: &str) -> Result<LoginOutcome, SessionError> {
        let user = self
            .db
            .users()
            .get_by_username(username)
            .await?
            .ok_or(SessionError::CredentialInvalid)?;

        if !password::verify(raw_password, &user.password_hash) {
            return Err(SessionError::CredentialInvalid);
        }
        if !user.enabled {
            return Err(SessionError::AccountDisabled);
        }

        let access = self
            .jwt
            .issue_access(&user.username, &user.roles, &user.privileges)
            .map_err(|e| SessionError::Internal(e.to_string()))?;
        let refresh = self.refresh.rotate(user.id).await?;

        Ok(LoginOutcome {
            username: user.username,
            access,
            refresh,
            refresh_max_age_secs: self.refresh.ttl().as_secs(),
        })
    }

    /// Revoke a refresh token. Idempotent; always succeeds from the
    /// caller's viewpoint unless the store itself is down.
    pub async fn logout(&self, refresh_value: &str) -> Result<(), SessionError> {
        self.refresh.revoke(refresh_value).await?;
        Ok(())
    }

    /// Register a new user. The plaintext password is hashed before any
    /// store operation and never persisted.
    pub async fn signup(&self, username: &str, raw_password: &str) -> Result<i64, SessionError> {
        if self.db.users().username_exists(username).await? {
            return Err(SessionError::UsernameTaken);
        }

        let hashed = password::hash(raw_password)
            .map_err(|e| SessionError::Internal(format!("Failed to hash password: {}", e)))?;
        let id = self.db.users().create(username, &hashed).await?;
        Ok(id)
    }
}
