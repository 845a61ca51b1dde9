//! User and profile models for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Account status. Only active users may log in or refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

/// User row. Never serialized: `password_hash` must not reach clients.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: Uuid,
    /// Lower-cased, unique
    pub email: String,
    pub username: String,
    /// Argon2 PHC string (salt embedded)
    pub password_hash: String,
    /// Legacy standalone salt, unused by verification
    pub salt: Option<String>,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable display attributes, 1:1 with [`User`].
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct UserProfile {
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// The identity asserted by an access token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    /// Stored nickname, if the profile has one
    pub nickname: Option<String>,
    pub status: UserStatus,
}

impl Identity {
    /// Nickname with the email local part as fallback.
    pub fn display_nickname(&self) -> String {
        resolve_nickname(self.nickname.as_deref(), &self.email)
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            user_id: self.user_id,
            email: self.email.clone(),
            username: self.username.clone(),
            nickname: self.display_nickname(),
        }
    }
}

/// Public user fields returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PublicUser {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub nickname: String,
}

/// Profile payload for `GET/PUT /api/profile`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileView {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub bio: Option<String>,
}

impl ProfileView {
    pub fn new(user: &User, profile: UserProfile) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            nickname: resolve_nickname(profile.nickname.as_deref(), &user.email),
            avatar_url: profile.avatar_url,
            phone: profile.phone,
            gender: profile.gender,
            bio: profile.bio,
        }
    }
}

/// The part of an email address before the `@`.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

fn resolve_nickname(nickname: Option<&str>, email: &str) -> String {
    match nickname {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => email_local_part(email).to_string(),
    }
}
