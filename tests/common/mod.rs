// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use portfolio_auth::config::Config;
use portfolio_auth::db::Db;
use portfolio_auth::routes::create_router;
use portfolio_auth::AppState;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Create a private in-memory database.
#[allow(dead_code)]
pub async fn test_db() -> Db {
    Db::in_memory()
        .await
        .expect("Failed to create in-memory database")
}

/// Create a test app over a fresh in-memory database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default()).await
}

/// Create a test app whose frontend (and cookie security) follows `frontend_url`.
#[allow(dead_code)]
pub async fn create_test_app_with_frontend_url(frontend_url: &str) -> (Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    config.secure_cookies = frontend_url.starts_with("https://");
    create_test_app_with_config(config).await
}

#[allow(dead_code)]
pub async fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let db = test_db().await;
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Create a test app over a WAL database file with several pooled connections,
/// so concurrent requests really run side by side. The database lives as long
/// as the returned directory.
#[allow(dead_code)]
pub async fn create_file_backed_app() -> (Router, Arc<AppState>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("sessions.db").display());
    let db = Db::connect(&url, 5)
        .await
        .expect("Failed to open file-backed database");

    let state = Arc::new(
        AppState::new(Config::test_default(), db).expect("Failed to build app state"),
    );
    (create_router(state.clone()), state, dir)
}

/// POST a JSON body.
#[allow(dead_code)]
pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::USER_AGENT, "integration-test")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// POST a raw, possibly malformed, JSON body.
#[allow(dead_code)]
pub async fn post_raw(app: &Router, uri: &str, body: &'static str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// POST with only a `Cookie` header and no body.
#[allow(dead_code)]
pub async fn post_with_cookie(app: &Router, uri: &str, cookie: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Log in (or sign up) with the given credentials.
#[allow(dead_code)]
pub async fn login(app: &Router, email: &str, password: &str) -> Response {
    post_json(
        app,
        "/api/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await
}

/// All `Set-Cookie` header values.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The full `Set-Cookie` header for `name`.
#[allow(dead_code)]
pub fn find_cookie(response: &Response, name: &str) -> String {
    let headers = set_cookie_headers(response);
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Just the value of the `name` cookie set by `response`.
#[allow(dead_code)]
pub fn cookie_value(response: &Response, name: &str) -> String {
    let cookie = find_cookie(response, name);
    cookie[name.len() + 1..]
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Read and parse a JSON response body.
#[allow(dead_code)]
pub async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
