// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token (JWT) issuance and verification.
//!
//! Access tokens are stateless: validity is the HS256 signature plus `exp`,
//! never a storage lookup. Refresh tokens are opaque and live in the ledger
//! (`db::refresh_tokens`).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ACCESS_TOKEN_TTL_SECS;
use crate::error::AppError;
use crate::models::Identity;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub nickname: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Mints and verifies access tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Fails when the signing secret is empty.
    pub fn new(signing_key: &[u8]) -> Result<Self, AppError> {
        if signing_key.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "JWT signing secret is not configured"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        })
    }

    /// Lifetime of every access token, in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        ACCESS_TOKEN_TTL_SECS
    }

    /// Create an access token for `identity`, valid for four hours from `now`.
    pub fn issue_access_token(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = AccessClaims {
            sub: identity.user_id,
            email: identity.email.clone(),
            username: identity.username.clone(),
            nickname: identity.display_nickname(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ACCESS_TOKEN_TTL_SECS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {e}")))
    }

    /// Verify signature and expiry of an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                AppError::InvalidToken
            })
    }
}
