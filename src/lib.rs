// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Portfolio-Auth: session backend for a personal portfolio site
//!
//! This crate provides credential login with auto-provisioning, short-lived
//! access tokens, rotating refresh tokens, logout, profile management and
//! guest accounts.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use error::AppError;
use services::{PasswordHasher, SessionService, TokenIssuer};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub sessions: SessionService,
}

impl AppState {
    /// Wire services together. Fails on an empty signing secret or invalid
    /// hashing parameters.
    pub fn new(config: Config, db: Db) -> Result<Self, AppError> {
        let hasher = PasswordHasher::new(config.argon2)?;
        let tokens = TokenIssuer::new(&config.jwt_signing_key)?;
        let sessions = SessionService::new(db.clone(), hasher, tokens);

        Ok(Self {
            config,
            db,
            sessions,
        })
    }
}
