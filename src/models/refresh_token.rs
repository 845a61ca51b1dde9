//! Refresh token ledger rows.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One outstanding long-lived session credential.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub refresh_token_id: i64,
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub client_info: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Usable only while not revoked and strictly before `expires_at`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

/// Where a session request came from; recorded alongside each refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: String,
    pub ip_address: String,
}

impl ClientInfo {
    pub fn unknown() -> Self {
        Self {
            user_agent: "unknown".to_string(),
            ip_address: "unknown".to_string(),
        }
    }
}
