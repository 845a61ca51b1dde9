// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store: users and their profiles.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Db, DbError, Result};
use crate::models::{Identity, ProfileView, User, UserProfile, UserStatus};

const USER_COLUMNS: &str = "user_id, email, username, password_hash, salt, status, \
     last_login_at, last_login_ip, created_at, updated_at";

/// Fields for a user created by login auto-provisioning or guest login.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    /// Set when the account is created by a login, so it counts as one
    pub login_ip: Option<String>,
}

/// Profile edit. `None` optional fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Identity lookup by user id; shared with refresh token rotation.
pub(super) const IDENTITY_QUERY: &str = "SELECT u.user_id, u.email, u.username, p.nickname, u.status
     FROM users u
     LEFT JOIN user_profiles p ON p.user_id = u.user_id
     WHERE u.user_id = ?";

impl Db {
    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by (lower-cased) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Get a user by id.
    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Load the identity claims for a user (joins the profile nickname).
    pub async fn find_identity(&self, user_id: Uuid) -> Result<Option<Identity>> {
        Ok(sqlx::query_as::<_, Identity>(IDENTITY_QUERY)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Create a user and its profile atomically.
    ///
    /// A concurrent creation with the same email surfaces as
    /// [`DbError::UniqueViolation`] rather than a second row.
    pub async fn create_user_with_profile(
        &self,
        new_user: &NewUser,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let user_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (user_id, email, username, password_hash, status,
                                last_login_at, last_login_ip, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(UserStatus::Active)
        .bind(new_user.login_ip.as_ref().map(|_| now))
        .bind(&new_user.login_ip)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_profiles (user_id, nickname, created_at, updated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(&new_user.nickname)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, "Created user");
        Ok(user)
    }

    /// Record a successful login.
    pub async fn record_login(&self, user_id: Uuid, ip: &str, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET last_login_at = ?, last_login_ip = ?, updated_at = ?
             WHERE user_id = ?",
        )
        .bind(now)
        .bind(ip)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get the profile view for a user. A missing profile row yields defaults.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileView>> {
        let Some(user) = self.find_user_by_id(user_id).await? else {
            return Ok(None);
        };

        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT nickname, phone, gender, bio, avatar_url
             FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or_default();

        Ok(Some(ProfileView::new(&user, profile)))
    }

    /// Update user fields and upsert the profile in one transaction.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
        now: DateTime<Utc>,
    ) -> Result<ProfileView> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET username = ?, email = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        let default_nickname = crate::models::email_local_part(&changes.email).to_string();

        sqlx::query(
            "INSERT INTO user_profiles
                 (user_id, nickname, phone, gender, bio, avatar_url, created_at, updated_at)
             VALUES (?, COALESCE(?, ?), ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id) DO UPDATE SET
                 nickname   = COALESCE(?, user_profiles.nickname),
                 phone      = COALESCE(excluded.phone, user_profiles.phone),
                 gender     = COALESCE(excluded.gender, user_profiles.gender),
                 bio        = COALESCE(excluded.bio, user_profiles.bio),
                 avatar_url = COALESCE(excluded.avatar_url, user_profiles.avatar_url),
                 updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(&changes.nickname)
        .bind(&default_nickname)
        .bind(&changes.phone)
        .bind(&changes.gender)
        .bind(&changes.bio)
        .bind(&changes.avatar_url)
        .bind(now)
        .bind(now)
        .bind(&changes.nickname)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT nickname, phone, gender, bio, avatar_url
             FROM user_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ProfileView::new(&user, profile))
    }
}
