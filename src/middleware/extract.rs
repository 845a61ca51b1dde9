// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request extractors shared by the session handlers.

use std::convert::Infallible;

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, header, HeaderMap},
    Json,
};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use validator::Validate;

use crate::error::AppError;
use crate::models::ClientInfo;

const UNKNOWN: &str = "unknown";

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(client_info_from_headers(&parts.headers))
    }
}

/// User agent and best-effort client IP.
///
/// The IP is the first `X-Forwarded-For` entry, else `X-Real-IP`, else
/// "unknown".
pub fn client_info_from_headers(headers: &HeaderMap) -> ClientInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string();

    let ip_address = header_str("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str("x-real-ip"))
        .unwrap_or(UNKNOWN)
        .to_string();

    ClientInfo {
        user_agent,
        ip_address,
    }
}

/// JSON body that has passed `validator` checks.
///
/// Malformed JSON and failed validation both surface as `PARAM_ERROR`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Serde hook that strips surrounding whitespace before validation runs.
///
/// Use as `#[serde(default, deserialize_with = "trimmed")]`.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[serde(default, deserialize_with = "trimmed")]
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let info = client_info_from_headers(&headers);
        assert_eq!(info.ip_address, "203.0.113.7");
        assert_eq!(info.user_agent, "curl/8.0");
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        let info = client_info_from_headers(&headers);
        assert_eq!(info.ip_address, "198.51.100.4");
        assert_eq!(info.user_agent, "unknown");
    }

    #[test]
    fn test_no_headers() {
        assert_eq!(client_info_from_headers(&HeaderMap::new()), ClientInfo::unknown());
    }

    #[test]
    fn test_trimmed_before_validation() {
        let signup: Signup = serde_json::from_str(r#"{"email": "  ann@example.com\t"}"#).unwrap();
        assert_eq!(signup.email, "ann@example.com");
        assert!(signup.validate().is_ok());

        let missing: Signup = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.email, "");
        assert!(missing.validate().is_err());
    }
}
