// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background garbage collection of expired refresh tokens.

use std::time::Duration;

use chrono::Utc;

use crate::db::Db;

/// Delete expired refresh tokens every `interval`, forever.
///
/// Failures are logged and retried on the next tick.
pub async fn run_token_sweeper(db: Db, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(&db).await;
    }
}

/// Run a single sweep. Returns the number of deleted tokens.
pub async fn sweep_once(db: &Db) -> u64 {
    match db.sweep_expired_refresh_tokens(Utc::now()).await {
        Ok(0) => 0,
        Ok(deleted) => {
            tracing::info!(deleted, "Swept expired refresh tokens");
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Refresh token sweep failed");
            0
        }
    }
}
