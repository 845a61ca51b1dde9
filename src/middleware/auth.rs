// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::config::ACCESS_TOKEN_COOKIE;
use crate::error::AppError;
use crate::services::tokens::AccessClaims;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
    pub nickname: String,
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            username: claims.username,
            nickname: claims.nickname,
        }
    }
}

/// Middleware that requires a valid access token.
///
/// The token is read from the `token` cookie, then from an
/// `Authorization: Bearer` header. Only signature and expiry are checked.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token_from(&jar, request.headers()).ok_or(AppError::Unauthorized)?;

    let claims = state.sessions.tokens().verify_access_token(&token)?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

fn access_token_from(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    // Try cookie first, then header
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
