// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The signing secret is mandatory: without it no token-issuing path can work,
//! so loading fails instead of falling back to a default.

use std::env;

use crate::services::password::Argon2Params;

/// Access token lifetime (4 hours).
pub const ACCESS_TOKEN_TTL_SECS: i64 = 4 * 60 * 60;

/// Refresh token lifetime (7 days).
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Maximum number of active refresh tokens a user may hold after an issuance.
pub const MAX_ACTIVE_REFRESH_TOKENS: i64 = 9;

/// Cookie carrying the access JWT.
pub const ACCESS_TOKEN_COOKIE: &str = "token";

/// Cookie carrying the opaque refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string, e.g. `sqlite://data/portfolio.db`
    pub database_url: String,
    /// Upper bound for pooled connections
    pub db_max_connections: u32,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Whether session cookies carry the `Secure` attribute
    pub secure_cookies: bool,
    /// Also return raw tokens in JSON bodies (API-only clients)
    pub tokens_in_body: bool,
    /// JWT signing key for access tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Password hashing cost
    pub argon2: Argon2Params,
    /// Seconds between expired refresh token sweeps
    pub token_sweep_interval_secs: u64,
}

impl Config {
    /// Config for tests: in-memory database and cheap password hashing.
    pub fn test_default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            frontend_url: "https://portfolio.example.dev".to_string(),
            port: 8080,
            secure_cookies: true,
            tokens_in_body: false,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            argon2: Argon2Params {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            token_sweep_interval_secs: 3600,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let jwt_signing_key = env::var("JWT_SECRET")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_signing_key.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // Browsers drop Secure cookies on plain-http localhost, so default from the frontend scheme.
        let secure_cookies = match env::var("COOKIE_SECURE") {
            Ok(v) => parse_bool("COOKIE_SECURE", &v)?,
            Err(_) => frontend_url.starts_with("https://"),
        };

        let tokens_in_body = match env::var("SESSION_TOKENS_IN_BODY") {
            Ok(v) => parse_bool("SESSION_TOKENS_IN_BODY", &v)?,
            Err(_) => false,
        };

        let defaults = Argon2Params::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            frontend_url,
            port: parse_or("PORT", 8080)?,
            secure_cookies,
            tokens_in_body,
            jwt_signing_key: jwt_signing_key.into_bytes(),
            argon2: Argon2Params {
                memory_kib: parse_or("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or("ARGON2_ITERATIONS", defaults.iterations)?,
                parallelism: parse_or("ARGON2_PARALLELISM", defaults.parallelism)?,
            },
            token_sweep_interval_secs: parse_or("TOKEN_SWEEP_INTERVAL_SECS", 3600)?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(name, raw.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
