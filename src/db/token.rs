//! Refresh token storage.
//!
//! Only refresh tokens are stored; access tokens are stateless and
//! short-lived. Each row is one live session, matched by the exact signed
//! token string. Deleting the row revokes the session.

use sqlx::sqlite::SqlitePool;

/// A persisted refresh token record.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    /// Expiration as Unix seconds.
    pub expires_at: i64,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    user_id: i64,
    token: String,
    expires_at: i64,
    created_at: String,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

/// Store for managing persisted refresh tokens.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a refresh token for a user.
    pub async fn create(
        &self,
        user_id: i64,
        token: &str,
        expires_at: u64,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(token)
                .bind(expires_at as i64)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Find a user's refresh token by exact string match.
    pub async fn find(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, user_id, token, expires_at, created_at
             FROM refresh_tokens WHERE user_id = ? AND token = ?",
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshToken::from))
    }

    /// Revoke a user's refresh token by exact string match.
    /// Returns true if a token was removed.
    pub async fn delete(&self, user_id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ? AND token = ?")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a user's expired refresh tokens. `now` is Unix seconds.
    pub async fn delete_expired_for_user(
        &self,
        user_id: i64,
        now: u64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ? AND expires_at < ?")
            .bind(user_id)
            .bind(now as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove all expired refresh tokens. `now` is Unix seconds.
    pub async fn delete_expired(&self, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(now as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List all live refresh tokens for a user.
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<RefreshToken>, sqlx::Error> {
        let rows: Vec<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, user_id, token, expires_at, created_at
             FROM refresh_tokens WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RefreshToken::from).collect())
    }
}
