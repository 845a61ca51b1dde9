// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every error body carries a stable machine-readable `code`; clients must key
//! off that field rather than the HTTP status alone.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::{DbError, RotateError};

/// Machine-readable error code sent in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ErrorCode {
    ParamError,
    Unauthorized,
    NotFound,
    Conflict,
    ServerError,
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Request validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Missing refresh token")]
    MissingRefreshToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("User does not exist or is disabled")]
    UserDisabled,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0} is already taken")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Error code reported to clients.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::ParamError,
            AppError::Unauthorized
            | AppError::InvalidToken
            | AppError::IncorrectPassword
            | AppError::MissingRefreshToken
            | AppError::InvalidRefreshToken
            | AppError::UserDisabled => ErrorCode::Unauthorized,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::ServerError,
        }
    }

    /// HTTP status matching [`AppError::code`].
    pub fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::ParamError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::NotFound("Record not found".to_string()),
            DbError::UniqueViolation { field, .. } => {
                AppError::Conflict(field.unwrap_or_else(|| "value".to_string()))
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<RotateError> for AppError {
    fn from(err: RotateError) -> Self {
        match err {
            RotateError::InvalidToken => AppError::InvalidRefreshToken,
            RotateError::UserDisabled => AppError::UserDisabled,
            RotateError::Db(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| FieldError {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", e.code)),
                })
            })
            .collect();
        // HashMap iteration order is unstable
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            AppError::Validation(fields) => {
                ("Request validation failed".to_string(), Some(fields))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("Internal server error".to_string(), None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            success: false,
            code,
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
