// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and verification (Argon2id).
//!
//! Digests are PHC strings, so the salt and cost parameters travel with the
//! hash and verification needs nothing else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::error::AppError;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    /// Argon2id RFC recommendation (19 MiB, 2 passes, 1 lane).
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Salted adaptive password hasher with a fixed work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(params: Argon2Params) -> Result<Self, AppError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid argon2 params: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password. Empty passwords are rejected.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(AppError::BadRequest("Password must not be empty".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Check a password against a stored digest.
    ///
    /// Malformed digests simply fail verification. The parameters embedded in
    /// the digest are used, not this hasher's.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password digest is malformed");
                false
            }
        }
    }

    /// [`PasswordHasher::hash`] on the blocking pool.
    pub async fn hash_async(&self, password: String) -> Result<String, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {e}")))?
    }

    /// [`PasswordHasher::verify`] on the blocking pool.
    pub async fn verify_async(&self, password: String, digest: String) -> Result<bool, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Verification task failed: {e}")))
    }
}
