// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: login, refresh, logout and guest accounts.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::{
    ACCESS_TOKEN_COOKIE, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_TTL_SECS,
};
use crate::error::{AppError, Result};
use crate::middleware::{trimmed, ValidatedJson};
use crate::models::{ClientInfo, PublicUser};
use crate::services::IssuedSession;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/refresh-token", post(refresh_token))
        .route("/api/logout", post(logout))
        .route("/api/auth/guest-login", post(guest_login))
}

// ─── Request / Response Types ────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Optional body of refresh and logout requests.
#[derive(Debug, Default, Deserialize)]
struct RefreshTokenBody {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Body returned after login or refresh.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GuestCredentials {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GuestLoginResponse {
    pub success: bool,
    pub message: String,
    pub user: GuestCredentials,
}

// ─── Handlers ────────────────────────────────────────────────

/// Log in, creating the account on first use of an email.
async fn login(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let outcome = state
        .sessions
        .login(&req.email, &req.password, &client, Utc::now())
        .await?;

    let (status, message) = if outcome.created {
        (StatusCode::CREATED, "Account created and logged in")
    } else {
        (StatusCode::OK, "Login successful")
    };

    let jar = set_session_cookies(jar, &outcome.session, state.config.secure_cookies);
    let body = session_response(message, outcome.session, state.config.tokens_in_body);

    Ok((status, jar, Json(body)))
}

/// Rotate the refresh token and mint a new access token.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let presented = presented_refresh_token(&jar, &body).ok_or(AppError::MissingRefreshToken)?;

    let session = state
        .sessions
        .refresh(&presented, &client, Utc::now())
        .await?;

    let jar = set_session_cookies(jar, &session, state.config.secure_cookies);
    let body = session_response("Token refreshed", session, state.config.tokens_in_body);

    Ok((jar, Json(body)))
}

/// Revoke the presented refresh token and clear both cookies. Always succeeds.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> (CookieJar, Json<MessageResponse>) {
    let presented = presented_refresh_token(&jar, &body);
    state.sessions.logout(presented.as_deref(), Utc::now()).await;

    let secure = state.config.secure_cookies;
    let jar = jar
        .add(session_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0, secure))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0, secure));

    (
        jar,
        Json(MessageResponse {
            success: true,
            message: "Logged out".to_string(),
        }),
    )
}

/// Provision a guest account and hand back its generated credentials.
async fn guest_login(State(state): State<Arc<AppState>>) -> Result<Json<GuestLoginResponse>> {
    let guest = state.sessions.provision_guest(Utc::now()).await?;

    Ok(Json(GuestLoginResponse {
        success: true,
        message: "Guest account created".to_string(),
        user: GuestCredentials {
            user_id: guest.user_id,
            email: guest.email,
            username: guest.username,
            password: guest.password,
        },
    }))
}

// ─── Helpers ─────────────────────────────────────────────────

/// Refresh token from the cookie, else from a JSON body. Never from the URL.
fn presented_refresh_token(jar: &CookieJar, body: &[u8]) -> Option<String> {
    if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    if body.is_empty() {
        return None;
    }

    serde_json::from_slice::<RefreshTokenBody>(body)
        .ok()
        .and_then(|b| b.refresh_token)
        .filter(|t| !t.is_empty())
}

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

fn set_session_cookies(jar: CookieJar, session: &IssuedSession, secure: bool) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        session.access_token.clone(),
        ACCESS_TOKEN_TTL_SECS,
        secure,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        session.refresh_token.clone(),
        REFRESH_TOKEN_TTL_SECS,
        secure,
    ))
}

fn session_response(message: &str, session: IssuedSession, tokens_in_body: bool) -> SessionResponse {
    let (token, refresh_token) = if tokens_in_body {
        (Some(session.access_token), Some(session.refresh_token))
    } else {
        (None, None)
    };

    SessionResponse {
        success: true,
        message: message.to_string(),
        user: session.user,
        expires_in: session.access_expires_in,
        token,
        refresh_token,
    }
}
