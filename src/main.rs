// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Portfolio-Auth API Server
//!
//! Session and profile backend for the portfolio frontend.

use portfolio_auth::{config::Config, db::Db, services::sweeper, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Portfolio-Auth API");

    // Open database and apply migrations
    let db = Db::connect(&config.database_url, config.db_max_connections)
        .await
        .expect("Failed to open database");
    tracing::info!("Database ready");

    // Expired refresh tokens are removed in the background
    let sweep_interval = Duration::from_secs(config.token_sweep_interval_secs);
    tokio::spawn(sweeper::run_token_sweeper(db.clone(), sweep_interval));
    tracing::info!(
        interval_secs = config.token_sweep_interval_secs,
        "Refresh token sweeper started"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db).expect("Failed to initialize services"));

    // Build router
    let app = portfolio_auth::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portfolio_auth=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
