// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh token ledger.
//!
//! Tokens are single-use: rotation revokes the presented token and inserts
//! exactly one replacement in the same transaction. The conditional revoke
//! (`WHERE is_revoked = 0 AND expires_at > now`) is the serialization point
//! between concurrent refreshes of the same token: only one of them can flip
//! the row, the other sees zero rows and reports `InvalidToken`.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::users::IDENTITY_QUERY;
use super::{Db, DbError, Result};
use crate::config::{MAX_ACTIVE_REFRESH_TOKENS, REFRESH_TOKEN_TTL_SECS};
use crate::models::{ClientInfo, Identity, RefreshToken, UserStatus};

/// Attempts made by [`Db::rotate_refresh_token`] when SQLite reports lock contention.
const ROTATE_ATTEMPTS: u32 = 3;

/// A freshly stored refresh token.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful rotation.
#[derive(Debug, Clone)]
pub struct Rotation {
    /// Identity read inside the rotation transaction
    pub identity: Identity,
    pub replacement: IssuedRefreshToken,
}

/// Why a rotation was refused.
#[derive(Debug, thiserror::Error)]
pub enum RotateError {
    #[error("invalid refresh token")]
    InvalidToken,

    #[error("user disabled")]
    UserDisabled,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for RotateError {
    fn from(err: sqlx::Error) -> Self {
        RotateError::Db(err.into())
    }
}

/// Generate a new opaque refresh token value and its expiry.
pub fn generate_refresh_token(now: DateTime<Utc>) -> IssuedRefreshToken {
    IssuedRefreshToken {
        token: Uuid::new_v4().to_string(),
        expires_at: now + Duration::seconds(REFRESH_TOKEN_TTL_SECS),
    }
}

impl Db {
    // ─── Refresh Token Operations ────────────────────────────────

    /// Store a new refresh token for `user_id`, applying the retention policy.
    pub async fn issue_refresh_token(
        &self,
        user_id: Uuid,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<IssuedRefreshToken> {
        let issued = generate_refresh_token(now);
        let mut tx = self.pool.begin().await?;

        enforce_retention(&mut *tx, user_id, now).await?;
        insert_token(&mut *tx, user_id, &issued, client, now).await?;

        tx.commit().await?;

        tracing::debug!(user_id = %user_id, "Issued refresh token");
        Ok(issued)
    }

    /// Exchange `old_token` for a new one.
    ///
    /// Nothing is visible to other connections until the transaction commits;
    /// on any error the presented token is left untouched.
    pub async fn rotate_refresh_token(
        &self,
        old_token: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> std::result::Result<Rotation, RotateError> {
        let mut attempt = 1;
        loop {
            match self.try_rotate(old_token, client, now).await {
                Err(RotateError::Db(DbError::Busy(msg))) if attempt < ROTATE_ATTEMPTS => {
                    tracing::warn!(attempt, error = %msg, "Refresh token rotation hit a locked database, retrying");
                    attempt += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(25 * u64::from(attempt))).await;
                }
                other => return other,
            }
        }
    }

    async fn try_rotate(
        &self,
        old_token: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> std::result::Result<Rotation, RotateError> {
        let mut tx = self.pool.begin().await?;

        // Writing first takes the write lock up front.
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE refresh_tokens SET is_revoked = 1, revoked_at = ?
             WHERE token = ? AND is_revoked = 0 AND expires_at > ?
             RETURNING user_id",
        )
        .bind(now)
        .bind(old_token)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Err(RotateError::InvalidToken);
        };

        // A missing or inactive owner rolls the revoke back with the dropped tx.
        let identity = sqlx::query_as::<_, Identity>(IDENTITY_QUERY)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(|identity| identity.status == UserStatus::Active)
            .ok_or(RotateError::UserDisabled)?;

        enforce_retention(&mut *tx, user_id, now).await?;

        let replacement = generate_refresh_token(now);
        insert_token(&mut *tx, user_id, &replacement, client, now).await?;

        tx.commit().await?;

        tracing::debug!(user_id = %user_id, "Rotated refresh token");
        Ok(Rotation {
            identity,
            replacement,
        })
    }

    /// Revoke a token without replacement. Returns whether a live token was revoked.
    pub async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = 1, revoked_at = ?
             WHERE token = ? AND is_revoked = 0",
        )
        .bind(now)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether `token` is currently usable.
    pub async fn is_refresh_token_valid(&self, token: &str, now: DateTime<Utc>) -> Result<bool> {
        let matches: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_tokens
             WHERE token = ? AND is_revoked = 0 AND expires_at > ?",
        )
        .bind(token)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(matches > 0)
    }

    /// Look up a token row regardless of its state.
    pub async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        Ok(sqlx::query_as::<_, RefreshToken>(
            "SELECT refresh_token_id, token, user_id, expires_at, is_revoked, revoked_at,
                    client_info, ip_address, created_at
             FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Number of usable tokens held by a user.
    pub async fn count_active_refresh_tokens(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_tokens
             WHERE user_id = ? AND is_revoked = 0 AND expires_at > ?",
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Delete every expired token, for all users.
    pub async fn sweep_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Prune the user's expired tokens, then trim active tokens so that one more
/// insertion leaves at most [`MAX_ACTIVE_REFRESH_TOKENS`], oldest first.
async fn enforce_retention(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<()> {
    let expired = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ? AND expires_at <= ?")
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let trimmed = sqlx::query(
        "DELETE FROM refresh_tokens
         WHERE user_id = ? AND is_revoked = 0 AND expires_at > ?
           AND refresh_token_id NOT IN (
               SELECT refresh_token_id FROM refresh_tokens
               WHERE user_id = ? AND is_revoked = 0 AND expires_at > ?
               ORDER BY created_at DESC, refresh_token_id DESC
               LIMIT ?
           )",
    )
    .bind(user_id)
    .bind(now)
    .bind(user_id)
    .bind(now)
    .bind(MAX_ACTIVE_REFRESH_TOKENS - 1)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if expired > 0 || trimmed > 0 {
        tracing::debug!(user_id = %user_id, expired, trimmed, "Pruned refresh tokens");
    }
    Ok(())
}

async fn insert_token(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    issued: &IssuedRefreshToken,
    client: &ClientInfo,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO refresh_tokens
             (token, user_id, expires_at, is_revoked, client_info, ip_address, created_at)
         VALUES (?, ?, ?, 0, ?, ?, ?)",
    )
    .bind(&issued.token)
    .bind(user_id)
    .bind(issued.expires_at)
    .bind(&client.user_agent)
    .bind(&client.ip_address)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
