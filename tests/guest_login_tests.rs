// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Guest account provisioning tests.

use axum::http::StatusCode;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_guest_login_returns_credentials() {
    let (app, state) = common::create_test_app().await;

    let response = common::post_json(&app, "/api/auth/guest-login", json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    // Credentials only; no session is started
    assert!(common::set_cookie_headers(&response).is_empty());

    let body = common::json_body(response).await;
    assert_eq!(body["success"], true);

    let email = body["user"]["email"].as_str().unwrap();
    let username = body["user"]["username"].as_str().unwrap();
    let password = body["user"]["password"].as_str().unwrap();

    assert!(username.starts_with("guest_"));
    assert_eq!(username.len(), "guest_".len() + 6);
    assert_eq!(password.len(), 12);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let user = state.db.find_user_by_email(email).await.unwrap().unwrap();
    assert_eq!(user.username, username);
    assert_ne!(user.password_hash, password);
}

#[tokio::test]
async fn test_guest_credentials_log_in() {
    let (app, _) = common::create_test_app().await;

    let response = common::post_json(&app, "/api/auth/guest-login", json!({})).await;
    let body = common::json_body(response).await;
    let email = body["user"]["email"].as_str().unwrap().to_string();
    let password = body["user"]["password"].as_str().unwrap().to_string();

    let response = common::login(&app, &email, &password).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::json_body(response).await;
    assert_eq!(body["user"]["username"], body["user"]["nickname"]);
}

#[tokio::test]
async fn test_guest_accounts_are_distinct() {
    let (app, _) = common::create_test_app().await;

    let a = common::json_body(common::post_json(&app, "/api/auth/guest-login", json!({})).await).await;
    let b = common::json_body(common::post_json(&app, "/api/auth/guest-login", json!({})).await).await;

    assert_ne!(a["user"]["user_id"], b["user"]["user_id"]);
    assert_ne!(a["user"]["email"], b["user"]["email"]);
}
