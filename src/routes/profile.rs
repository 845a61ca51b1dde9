// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for authenticated users.

use crate::db::users::ProfileChanges;
use crate::error::{AppError, Result};
use crate::middleware::{trimmed, AuthUser, ValidatedJson};
use crate::models::ProfileView;
use crate::services::session::normalize_email;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Profile routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile).put(update_profile))
}

/// Profile update payload. Omitted optional fields keep their stored value.
#[derive(Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 50, message = "Username must be 1-50 characters"))]
    pub username: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(max = 50, message = "Nickname must be at most 50 characters"))]
    pub nickname: Option<String>,
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 10, message = "Gender must be at most 10 characters"))]
    pub gender: Option<String>,
    pub bio: Option<String>,
    #[validate(length(max = 255, message = "Avatar URL must be at most 255 characters"))]
    pub avatar_url: Option<String>,
}

impl From<ProfileUpdate> for ProfileChanges {
    fn from(update: ProfileUpdate) -> Self {
        Self {
            username: update.username,
            email: normalize_email(&update.email),
            nickname: update.nickname,
            phone: update.phone,
            gender: update.gender,
            bio: update.bio,
            avatar_url: update.avatar_url,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub success: bool,
    pub message: String,
    pub data: ProfileView,
}

/// Get current user profile.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .db
        .get_profile(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile fetched".to_string(),
        data: profile,
    }))
}

/// Update user and profile fields together.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(update): ValidatedJson<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    let changes = ProfileChanges::from(update);

    let profile = state
        .db
        .update_profile(user.user_id, &changes, Utc::now())
        .await?;

    tracing::info!(user_id = %user.user_id, "Profile updated");

    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile updated".to_string(),
        data: profile,
    }))
}
