// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reasons a write request fails authentication.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Authorization header must be 'Bearer <access token>'")]
    InvalidAuthHeader,

    #[error("Access token is malformed")]
    MalformedToken,

    #[error("Access token signature does not verify")]
    InvalidSignature,

    #[error("Access token has expired")]
    TokenExpired,

    #[error("Access token is not valid yet")]
    TokenNotYetValid,

    /// Wrong `iss` or `aud`: the token belongs to another embedded-wallet app.
    #[error("Access token was not issued for this app")]
    ForeignToken,

    #[error("No ES256 signing key matches the access token")]
    UnknownSigningKey,

    #[error("Signing keys unavailable: {0}")]
    KeysUnavailable(String),

    #[error("HTTP client for signing keys: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: &'static str,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::ForeignToken => "foreign_token",
            AuthError::UnknownSigningKey => "unknown_signing_key",
            AuthError::KeysUnavailable(_) => "signing_keys_unavailable",
            AuthError::HttpClient(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::KeysUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::warn!(error = %self, "Authentication could not complete");
        }
        let body = AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_header_is_401_with_code() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_auth_header");
        assert_eq!(body["error"], "Authorization header is required");
    }

    #[test]
    fn token_problems_are_unauthorized() {
        for error in [
            AuthError::TokenExpired,
            AuthError::ForeignToken,
            AuthError::UnknownSigningKey,
        ] {
            assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn unreachable_key_set_is_unavailable() {
        let error = AuthError::KeysUnavailable("timeout".into());
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.error_code(), "signing_keys_unavailable");
        assert_eq!(error.to_string(), "Signing keys unavailable: timeout");
    }
}
