// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login and auto-provisioning tests.

use axum::http::StatusCode;
use chrono::Utc;
use portfolio_auth::config::{Config, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use portfolio_auth::models::UserStatus;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_first_login_provisions_user() {
    let (app, state) = common::create_test_app().await;

    let response = common::login(&app, "new@example.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = common::json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "new@example.com");
    assert_eq!(body["user"]["username"], "new");
    assert_eq!(body["user"]["nickname"], "new");
    assert_eq!(body["expires_in"], 4 * 60 * 60);
    // Tokens travel in cookies only by default
    assert!(body.get("token").is_none());
    assert!(body.get("refresh_token").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let user = state
        .db
        .find_user_by_email("new@example.com")
        .await
        .unwrap()
        .expect("user was provisioned");
    assert_eq!(user.status, UserStatus::Active);
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert_eq!(user.last_login_ip.as_deref(), Some("203.0.113.9"));

    let profile = state.db.get_profile(user.user_id).await.unwrap().unwrap();
    assert_eq!(profile.nickname, "new");
}

#[tokio::test]
async fn test_existing_user_login() {
    let (app, state) = common::create_test_app().await;

    let first = common::login(&app, "alice@example.com", "secret1").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = common::login(&app, "alice@example.com", "secret1").await;
    assert_eq!(second.status(), StatusCode::OK);

    let token = common::cookie_value(&second, ACCESS_TOKEN_COOKIE);
    let refresh = common::cookie_value(&second, REFRESH_TOKEN_COOKIE);
    assert!(!token.is_empty());
    assert!(state
        .db
        .is_refresh_token_valid(&refresh, Utc::now())
        .await
        .unwrap());

    let body = common::json_body(second).await;
    assert_eq!(body["message"], "Login successful");
}

#[tokio::test]
async fn test_email_is_case_insensitive() {
    let (app, _) = common::create_test_app().await;

    let first = common::login(&app, "Bob@Example.com", "secret1").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = common::login(&app, "  bob@example.COM ", "secret1").await;
    assert_eq!(second.status(), StatusCode::OK);

    let body = common::json_body(second).await;
    assert_eq!(body["user"]["email"], "bob@example.com");
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let (app, _) = common::create_test_app().await;

    common::login(&app, "carol@example.com", "secret1").await;
    let response = common::login(&app, "carol@example.com", "wrong-password").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(common::set_cookie_headers(&response).is_empty());

    let body = common::json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["message"], "Incorrect password");
}

#[tokio::test]
async fn test_disabled_user_rejected() {
    let (app, state) = common::create_test_app().await;

    common::login(&app, "dave@example.com", "secret1").await;
    sqlx::query("UPDATE users SET status = 'disabled' WHERE email = ?")
        .bind("dave@example.com")
        .execute(state.db.pool())
        .await
        .unwrap();

    let response = common::login(&app, "dave@example.com", "secret1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = common::json_body(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_invalid_credentials_format() {
    let (app, _) = common::create_test_app().await;

    let response = common::login(&app, "not-an-email", "123").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = common::json_body(response).await;
    assert_eq!(body["code"], "PARAM_ERROR");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_missing_fields_and_malformed_json() {
    let (app, _) = common::create_test_app().await;

    let response = common::post_json(&app, "/api/login", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::json_body(response).await;
    assert_eq!(body["code"], "PARAM_ERROR");

    let response = common::post_raw(&app, "/api/login", "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::json_body(response).await;
    assert_eq!(body["code"], "PARAM_ERROR");
}

#[tokio::test]
async fn test_concurrent_first_logins_create_one_user() {
    let (app, state) = common::create_test_app().await;

    let (a, b) = tokio::join!(
        common::login(&app, "race@example.com", "secret1"),
        common::login(&app, "race@example.com", "secret1"),
    );

    let mut statuses = vec![a.status(), b.status()];
    statuses.sort();
    assert!(
        statuses == vec![StatusCode::OK, StatusCode::CREATED]
            || statuses == vec![StatusCode::CREATED, StatusCode::CONFLICT],
        "unexpected statuses {statuses:?}"
    );

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind("race@example.com")
        .fetch_one(state.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_first_logins_on_shared_database() {
    const RACERS: usize = 4;
    let (app, state, _dir) = common::create_file_backed_app().await;

    for round in 0..5 {
        let email = format!("signup{round}@example.com");

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let app = app.clone();
                let email = email.clone();
                tokio::spawn(async move { common::login(&app, &email, "secret1").await.status() })
            })
            .collect();

        let mut statuses = Vec::new();
        for handle in handles {
            statuses.push(handle.await.unwrap());
        }

        let created = statuses
            .iter()
            .filter(|s| **s == StatusCode::CREATED)
            .count();
        assert_eq!(created, 1, "round {round}: {statuses:?}");
        assert!(
            statuses.iter().all(|s| matches!(
                *s,
                StatusCode::CREATED | StatusCode::OK | StatusCode::CONFLICT
            )),
            "round {round}: {statuses:?}"
        );

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(&email)
            .fetch_one(state.db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1, "round {round}");
    }
}

#[tokio::test]
async fn test_tokens_in_body_when_configured() {
    let mut config = Config::test_default();
    config.tokens_in_body = true;
    let (app, _) = common::create_test_app_with_config(config).await;

    let response = common::login(&app, "api@example.com", "secret1").await;
    let cookie_token = common::cookie_value(&response, ACCESS_TOKEN_COOKIE);
    let cookie_refresh = common::cookie_value(&response, REFRESH_TOKEN_COOKIE);

    let body = common::json_body(response).await;
    assert_eq!(body["token"], cookie_token.as_str());
    assert_eq!(body["refresh_token"], cookie_refresh.as_str());
}
