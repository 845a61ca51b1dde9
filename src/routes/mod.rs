// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod profile;

use crate::middleware::auth::require_auth;
use crate::AppState;
use axum::http::{header, request::Parts, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Liveness payload.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Origins allowed to send cookies: the configured frontend, plus local dev servers.
fn is_allowed_origin(origin: &str, frontend_url: &str) -> bool {
    origin == frontend_url.trim_end_matches('/')
        || origin.starts_with("http://localhost")
        || origin.starts_with("http://127.0.0.1")
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            origin
                .to_str()
                .is_ok_and(|origin| is_allowed_origin(origin, &frontend_url))
        }))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Session endpoints authenticate by credentials or refresh token
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes());

    // Protected routes (access token required)
    let protected_routes =
        profile::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontend_origin_allowed() {
        let frontend = "https://portfolio.example.dev/";
        assert!(is_allowed_origin("https://portfolio.example.dev", frontend));
        assert!(is_allowed_origin("http://localhost:5173", frontend));
        assert!(is_allowed_origin("http://127.0.0.1:3000", frontend));
    }

    #[test]
    fn test_other_origins_rejected() {
        let frontend = "https://portfolio.example.dev";
        assert!(!is_allowed_origin("https://portfolio.example.dev.evil.com", frontend));
        assert!(!is_allowed_origin("http://portfolio.example.dev", frontend));
        assert!(!is_allowed_origin("https://localhost", frontend));
    }
}
