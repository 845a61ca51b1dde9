// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use portfolio_auth::db::{DbError, RotateError};
use portfolio_auth::error::{AppError, ErrorCode, FieldError};

async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[test]
fn test_auth_failures_are_unauthorized() {
    for err in [
        AppError::Unauthorized,
        AppError::InvalidToken,
        AppError::IncorrectPassword,
        AppError::MissingRefreshToken,
        AppError::InvalidRefreshToken,
        AppError::UserDisabled,
    ] {
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}

#[test]
fn test_db_error_translation() {
    let err: AppError = DbError::UniqueViolation {
        field: Some("email".to_string()),
        message: "UNIQUE constraint failed: users.email".to_string(),
    }
    .into();
    assert!(matches!(&err, AppError::Conflict(f) if f == "email"));
    assert_eq!(err.status(), StatusCode::CONFLICT);

    let err: AppError = DbError::NotFound.into();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err: AppError = DbError::Busy("database is locked".to_string()).into();
    assert_eq!(err.code(), ErrorCode::ServerError);
}

#[test]
fn test_rotate_error_translation() {
    assert!(matches!(
        AppError::from(RotateError::InvalidToken),
        AppError::InvalidRefreshToken
    ));
    assert!(matches!(
        AppError::from(RotateError::UserDisabled),
        AppError::UserDisabled
    ));
    assert_eq!(
        AppError::from(RotateError::Db(DbError::Busy("locked".to_string()))).code(),
        ErrorCode::ServerError
    );
}

#[tokio::test]
async fn test_validation_error_body() {
    let (status, body) = body_of(AppError::Validation(vec![FieldError {
        field: "email".to_string(),
        message: "Invalid email address".to_string(),
    }]))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PARAM_ERROR");
    assert_eq!(body["details"][0]["field"], "email");
    assert_eq!(body["details"][0]["message"], "Invalid email address");
}

#[tokio::test]
async fn test_server_error_details_hidden() {
    let (status, body) = body_of(AppError::Database(
        "no such table: users (secret detail)".to_string(),
    ))
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "SERVER_ERROR");
    assert_eq!(body["message"], "Internal server error");
    assert!(body.get("details").is_none());
}
