//! Refresh token record storage.
//!
//! Only refresh tokens are persisted; access tokens are stateless and
//! short-lived. Revocation flips the `revoked` flag so a record's history
//! survives until the expiry sweep removes it. Every mutation is a single
//! SQL statement, which gives per-row atomicity against a concurrent
//! revoke or sweep.

use sqlx::sqlite::SqlitePool;

/// A persisted refresh token record.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub token_value: String,
    /// Expiry (Unix timestamp, seconds). Set once at insert, never extended.
    pub expires_at: i64,
    pub revoked: bool,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    user_id: i64,
    token_value: String,
    expires_at: i64,
    revoked: i32,
    created_at: String,
}

impl From<RecordRow> for RefreshTokenRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_value: row.token_value,
            expires_at: row.expires_at,
            revoked: row.revoked != 0,
            created_at: row.created_at,
        }
    }
}

/// Store for refresh token records.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record. Returns the row ID.
    /// The token value must be unique; the UNIQUE constraint rejects reuse.
    pub async fn insert(
        &self,
        user_id: i64,
        token_value: &str,
        expires_at: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_value, expires_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(token_value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Look up a record by its token value.
    pub async fn find_by_value(
        &self,
        token_value: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT id, user_id, token_value, expires_at, revoked, created_at
             FROM refresh_tokens WHERE token_value = ?",
        )
        .bind(token_value)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    /// Mark a record revoked. Returns whether a live record was affected;
    /// revoking an already-revoked or unknown value affects nothing.
    pub async fn revoke(&self, token_value: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE token_value = ? AND revoked = 0")
                .bind(token_value)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every live record owned by a user. Returns the count revoked.
    pub async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND revoked = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Delete records whose own expiry is at or before `now`.
    /// The comparison is against the stored expires_at only, so an
    /// unexpired row is never removed regardless of the sweeper's clock.
    pub async fn delete_expired(&self, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count unrevoked, unexpired records for a user.
    pub async fn count_active_for_user(&self, user_id: i64, now: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM refresh_tokens
             WHERE user_id = ? AND revoked = 0 AND expires_at > ?",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}
