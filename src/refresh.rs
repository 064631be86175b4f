//! Refresh token rotation and validation policy.
//!
//! The store holds records; this service enforces the single-active-token
//! invariant. `rotate` revokes every prior live record for the owner before
//! inserting the replacement, so a stale token from an earlier session is
//! unusable the moment a new one exists. Validation never mutates state.

use std::time::Duration;

use crate::db::{Database, RefreshTokenRecord};
use crate::jwt;

/// Refresh token validation failures.
#[derive(Debug)]
pub enum RefreshError {
    /// No record exists for the presented value
    NotFound,
    /// The record was revoked (logout, rotation, or administrative action)
    Revoked,
    /// The record's own expiry has passed
    Expired,
    /// Backing store failure; callers must fail closed
    Store(sqlx::Error),
    /// System clock error
    Clock,
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshError::NotFound => write!(f, "Refresh token not found"),
            RefreshError::Revoked => write!(f, "Refresh token has been revoked"),
            RefreshError::Expired => write!(f, "Refresh token expired"),
            RefreshError::Store(e) => write!(f, "Refresh token store error: {}", e),
            RefreshError::Clock => write!(f, "System clock error"),
        }
    }
}

impl std::error::Error for RefreshError {}

impl From<sqlx::Error> for RefreshError {
    fn from(e: sqlx::Error) -> Self {
        RefreshError::Store(e)
    }
}

/// Orchestrates refresh token issuance and validation on top of the store.
#[derive(Clone)]
pub struct RefreshTokenService {
    db: Database,
    refresh_ttl: Duration,
}

impl RefreshTokenService {
    pub fn new(db: Database, refresh_ttl: Duration) -> Self {
        Self { db, refresh_ttl }
    }

    /// Lifetime applied to newly issued records (also the cookie Max-Age).
    pub fn ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Replace the owner's active refresh token.
    ///
    /// Prior live records are revoked before the new record is inserted, so
    /// no window exists in which two tokens are live. Expired rows are
    /// pruned opportunistically while we are here.
    pub async fn rotate(&self, user_id: i64) -> Result<RefreshTokenRecord, RefreshError> {
        let now = self.now()?;
        let store = self.db.refresh_tokens();

        store.revoke_all_for_user(user_id).await?;
        store.delete_expired(now).await?;

        let token_value = jwt::issue_refresh_value();
        let expires_at = now + self.refresh_ttl.as_secs() as i64;
        store.insert(user_id, &token_value, expires_at).await?;

        store
            .find_by_value(&token_value)
            .await?
            .ok_or(RefreshError::NotFound)
    }

    /// Validate a presented refresh token value.
    ///
    /// Rejects revoked and expired records. Performs no store mutation, so
    /// a failed validation cannot disturb another session's state.
    pub async fn validate(&self, token_value: &str) -> Result<RefreshTokenRecord, RefreshError> {
        let record = self
            .db
            .refresh_tokens()
            .find_by_value(token_value)
            .await?
            .ok_or(RefreshError::NotFound)?;

        if record.revoked {
            return Err(RefreshError::Revoked);
        }
        if record.expires_at <= self.now()? {
            return Err(RefreshError::Expired);
        }
        Ok(record)
    }

    /// Revoke a refresh token. Idempotent: revoking an already-revoked or
    /// unknown value succeeds.
    pub async fn revoke(&self, token_value: &str) -> Result<(), RefreshError> {
        self.db.refresh_tokens().revoke(token_value).await?;
        Ok(())
    }

    /// Remove records whose expiry has passed. Safe to run concurrently
    /// with validate/rotate.
    pub async fn prune_expired(&self) -> Result<u64, RefreshError> {
        let now = self.now()?;
        Ok(self.db.refresh_tokens().delete_expired(now).await?)
    }

    fn now(&self) -> Result<i64, RefreshError> {
        jwt::unix_now()
            .map(|n| n as i64)
            .map_err(|_| RefreshError::Clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Database, RefreshTokenService, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let user_id = db.users().create("alice", "hash").await.unwrap();
        let service = RefreshTokenService::new(db.clone(), Duration::from_secs(900));
        (db, service, user_id)
    }

    #[tokio::test]
    async fn test_rotate_revokes_prior_record() {
        let (_db, service, user_id) = setup().await;

        let first = service.rotate(user_id).await.unwrap();
        assert!(service.validate(&first.token_value).await.is_ok());

        let second = service.rotate(user_id).await.unwrap();
        assert_ne!(first.token_value, second.token_value);

        match service.validate(&first.token_value).await {
            Err(RefreshError::Revoked) => {}
            other => panic!("expected Revoked, got {:?}", other.map(|r| r.id)),
        }
        assert!(service.validate(&second.token_value).await.is_ok());
    }

    #[tokio::test]
    async fn test_single_active_record_after_repeated_rotation() {
        let (db, service, user_id) = setup().await;

        for _ in 0..3 {
            service.rotate(user_id).await.unwrap();
        }

        let now = jwt::unix_now().unwrap() as i64;
        let active = db
            .refresh_tokens()
            .count_active_for_user(user_id, now)
            .await
            .unwrap();
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn test_validate_unknown_value() {
        let (_db, service, _user_id) = setup().await;
        match service.validate("no-such-token").await {
            Err(RefreshError::NotFound) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn test_validate_expired_record() {
        let (db, service, user_id) = setup().await;

        let now = jwt::unix_now().unwrap() as i64;
        db.refresh_tokens()
            .insert(user_id, "stale", now - 10)
            .await
            .unwrap();

        match service.validate("stale").await {
            Err(RefreshError::Expired) => {}
            other => panic!("expected Expired, got {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (_db, service, user_id) = setup().await;

        let record = service.rotate(user_id).await.unwrap();
        service.revoke(&record.token_value).await.unwrap();
        service.revoke(&record.token_value).await.unwrap();
        service.revoke("never-existed").await.unwrap();

        match service.validate(&record.token_value).await {
            Err(RefreshError::Revoked) => {}
            other => panic!("expected Revoked, got {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn test_expiry_derived_from_ttl() {
        let (_db, service, user_id) = setup().await;

        let before = jwt::unix_now().unwrap() as i64;
        let record = service.rotate(user_id).await.unwrap();
        let after = jwt::unix_now().unwrap() as i64;

        assert!(record.expires_at >= before + 900);
        assert!(record.expires_at <= after + 900);
    }
}
