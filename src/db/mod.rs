// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (SQLite via sqlx).
//!
//! Provides typed operations for:
//! - Users and profiles (credential store)
//! - Refresh tokens (the session ledger)

pub mod refresh_tokens;
pub mod users;

pub use refresh_tokens::{IssuedRefreshToken, RotateError, Rotation};

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Relational store handle shared by all requests.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Connect to the database at `url` and apply pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(url, max_connections, "Connected to database");
        Ok(db)
    }

    /// Create a private in-memory database for testing.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Other(anyhow::Error::from(e)))
    }

    /// Underlying pool, for ad-hoc queries in tests and maintenance tasks.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Unified error type for database operations that application code can handle
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation: {message}")]
    UniqueViolation {
        /// Column that collided, when SQLite reports it
        field: Option<String>,
        message: String,
    },

    /// The database was locked by a concurrent writer
    #[error("Database busy: {0}")]
    Busy(String),

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// SQLite primary result codes (low byte of the extended code).
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        field: extract_unique_column(db_err.message()),
                        message: db_err.message().to_string(),
                    }
                } else if is_busy_code(db_err.code().as_deref()) {
                    DbError::Busy(db_err.message().to_string())
                } else {
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

fn is_busy_code(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i64>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

/// Extract the column from a SQLite message such as
/// `UNIQUE constraint failed: users.email`.
fn extract_unique_column(message: &str) -> Option<String> {
    let (_, columns) = message.split_once("constraint failed: ")?;
    let first = columns.split(',').next()?.trim();
    let column = first.rsplit('.').next()?;
    (!column.is_empty()).then(|| column.to_string())
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
