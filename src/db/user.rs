//! User credential and role/privilege lookup.

use std::collections::BTreeSet;

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// A user with the derived role and privilege sets used to mint tokens.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub enabled: bool,
    pub roles: BTreeSet<String>,
    pub privileges: BTreeSet<String>,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    enabled: i32,
}

/// Public user summary for the admin listing. Does not expose password hashes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserSummary {
    pub username: String,
    pub enabled: bool,
    pub roles: Vec<String>,
    pub created_at: String,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user with the default ROLE_USER. Returns the user ID.
    /// The password must already be hashed by the caller.
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        let id = result.last_insert_rowid();
        self.assign_role(id, "ROLE_USER").await?;
        Ok(id)
    }

    /// Create a new admin user holding both ROLE_ADMIN and ROLE_USER.
    pub async fn create_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let id = self.create(username, password_hash).await?;
        self.assign_role(id, "ROLE_ADMIN").await?;
        Ok(id)
    }

    /// Grant a role to a user by role name. Unknown role names are a no-op.
    pub async fn assign_role(&self, user_id: i64, role: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id)
             SELECT ?, id FROM roles WHERE name = ?",
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a user by username, with roles and privileges resolved.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, enabled FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.resolve(row).await?)),
            None => Ok(None),
        }
    }

    /// Get a user by ID, with roles and privileges resolved.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, password_hash, enabled FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(self.resolve(row).await?)),
            None => Ok(None),
        }
    }

    async fn resolve(&self, row: UserRow) -> Result<User, sqlx::Error> {
        let roles: Vec<(String,)> = sqlx::query_as(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON r.id = ur.role_id
             WHERE ur.user_id = ?",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let privileges: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT p.name FROM privileges p
             JOIN role_privileges rp ON p.id = rp.privilege_id
             JOIN user_roles ur ON ur.role_id = rp.role_id
             WHERE ur.user_id = ?",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            enabled: row.enabled != 0,
            roles: roles.into_iter().map(|r| r.0).collect(),
            privileges: privileges.into_iter().map(|p| p.0).collect(),
        })
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Check whether a username is already taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Enable or disable a user account.
    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET enabled = ? WHERE id = ?")
            .bind(if enabled { 1 } else { 0 })
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all users for the admin view. Does not expose password hashes.
    pub async fn list(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        let rows: Vec<(i64, String, i32, String)> = sqlx::query_as(
            "SELECT id, username, enabled, created_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (id, username, enabled, created_at) in rows {
            let roles: Vec<(String,)> = sqlx::query_as(
                "SELECT r.name FROM roles r
                 JOIN user_roles ur ON r.id = ur.role_id
                 WHERE ur.user_id = ? ORDER BY r.name",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

            summaries.push(UserSummary {
                username,
                enabled: enabled != 0,
                roles: roles.into_iter().map(|r| r.0).collect(),
                created_at,
            });
        }
        Ok(summaries)
    }
}
