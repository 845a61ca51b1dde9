// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod password;
pub mod session;
pub mod sweeper;
pub mod tokens;

pub use password::{Argon2Params, PasswordHasher};
pub use session::{GuestAccount, IssuedSession, LoginOutcome, SessionService};
pub use tokens::{AccessClaims, TokenIssuer};
