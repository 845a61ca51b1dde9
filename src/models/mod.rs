// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod refresh_token;
pub mod user;

pub use refresh_token::{ClientInfo, RefreshToken};
pub use user::{email_local_part, Identity, ProfileView, PublicUser, User, UserProfile, UserStatus};
