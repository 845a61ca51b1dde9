// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, refresh, logout and guest provisioning.
//!
//! Orchestrates the credential store, password hasher, token issuer and
//! refresh token ledger. Handlers only translate HTTP to and from these calls.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::db::users::NewUser;
use crate::db::Db;
use crate::error::AppError;
use crate::models::{email_local_part, ClientInfo, Identity, PublicUser, UserStatus};
use crate::services::password::PasswordHasher;
use crate::services::tokens::TokenIssuer;

const GUEST_EMAIL_DOMAIN: &str = "guest.local";
const GUEST_PASSWORD_LEN: usize = 12;

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

/// Outcome of a login attempt that succeeded.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The account was provisioned by this login
    pub created: bool,
    pub session: IssuedSession,
}

/// Credentials of a freshly provisioned guest account.
#[derive(Debug, Clone)]
pub struct GuestAccount {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    /// Plain-text password, returned exactly once
    pub password: String,
}

/// Session service shared by all handlers.
#[derive(Clone)]
pub struct SessionService {
    db: Db,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl SessionService {
    pub fn new(db: Db, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self { db, hasher, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Verify credentials, provisioning the account when the email is unknown.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AppError> {
        let email = normalize_email(email);

        let (user_id, created) = match self.db.find_user_by_email(&email).await? {
            Some(user) => {
                if user.status != UserStatus::Active {
                    tracing::warn!(user_id = %user.user_id, "Login attempt for disabled user");
                    return Err(AppError::UserDisabled);
                }

                let matches = self
                    .hasher
                    .verify_async(password.to_string(), user.password_hash.clone())
                    .await?;
                if !matches {
                    tracing::info!(user_id = %user.user_id, ip = %client.ip_address, "Incorrect password");
                    return Err(AppError::IncorrectPassword);
                }

                self.db
                    .record_login(user.user_id, &client.ip_address, now)
                    .await?;
                (user.user_id, false)
            }
            None => {
                let password_hash = self.hasher.hash_async(password.to_string()).await?;
                let local_part = email_local_part(&email).to_string();

                let new_user = NewUser {
                    username: local_part.clone(),
                    nickname: local_part,
                    email,
                    password_hash,
                    login_ip: Some(client.ip_address.clone()),
                };

                let user = self.db.create_user_with_profile(&new_user, now).await?;
                (user.user_id, true)
            }
        };

        let identity = self.load_identity(user_id).await?;
        let session = self.start_session(&identity, client, now).await?;

        tracing::info!(user_id = %user_id, created, "User logged in");
        Ok(LoginOutcome { created, session })
    }

    /// Rotate a refresh token and mint a new access token for the same identity.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AppError> {
        let rotation = self
            .db
            .rotate_refresh_token(refresh_token, client, now)
            .await?;
        let identity = rotation.identity;

        let access_token = self.tokens.issue_access_token(&identity, now)?;

        tracing::info!(user_id = %identity.user_id, "Refreshed session");
        Ok(IssuedSession {
            access_token,
            access_expires_in: self.tokens.access_ttl_secs(),
            refresh_token: rotation.replacement.token,
            refresh_expires_at: rotation.replacement.expires_at,
            user: identity.to_public(),
        })
    }

    /// Revoke the presented refresh token, if any. Never fails the caller.
    pub async fn logout(&self, refresh_token: Option<&str>, now: DateTime<Utc>) {
        let Some(token) = refresh_token else {
            return;
        };

        match self.db.revoke_refresh_token(token, now).await {
            Ok(revoked) => tracing::info!(revoked, "User logged out"),
            Err(e) => tracing::warn!(error = %e, "Failed to revoke refresh token on logout"),
        }
    }

    /// Create a throwaway account with random credentials.
    pub async fn provision_guest(&self, now: DateTime<Utc>) -> Result<GuestAccount, AppError> {
        let email = format!(
            "{}@{}",
            random_alphanumeric(8).to_ascii_lowercase(),
            GUEST_EMAIL_DOMAIN
        );
        let username = format!("guest_{}", random_alphanumeric(6));
        let password = random_alphanumeric(GUEST_PASSWORD_LEN);

        let password_hash = self.hasher.hash_async(password.clone()).await?;

        let new_user = NewUser {
            email: email.clone(),
            username: username.clone(),
            password_hash,
            nickname: username.clone(),
            login_ip: None,
        };
        let user = self.db.create_user_with_profile(&new_user, now).await?;

        tracing::info!(user_id = %user.user_id, "Provisioned guest user");
        Ok(GuestAccount {
            user_id: user.user_id,
            email,
            username,
            password,
        })
    }

    async fn load_identity(&self, user_id: Uuid) -> Result<Identity, AppError> {
        self.db
            .find_identity(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
    }

    async fn start_session(
        &self,
        identity: &Identity,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AppError> {
        let access_token = self.tokens.issue_access_token(identity, now)?;
        let refresh = self
            .db
            .issue_refresh_token(identity.user_id, client, now)
            .await?;

        Ok(IssuedSession {
            access_token,
            access_expires_in: self.tokens.access_ttl_secs(),
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
            user: identity.to_public(),
        })
    }
}

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
