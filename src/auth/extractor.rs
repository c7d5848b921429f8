// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, Validation};

use super::claims::PrivyClaims;
use super::{AuthError, AuthenticatedUser, PrivyKeySet};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
///
/// - **Production mode** (`PRIVY_APP_ID` set): full verification against the app's JWKS
/// - **Development mode**: structure and expiry only, no signature check
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token, &state.auth_config).await?;
        tracing::debug!(user_id = %user.user_id, "Authenticated request");

        Ok(Auth(user))
    }
}

async fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    match &auth_config.jwks {
        Some(keys) => verify_jwt_production(token, keys, auth_config).await,
        None => verify_jwt_development(token),
    }
}

async fn verify_jwt_production(
    token: &str,
    keys: &PrivyKeySet,
    auth_config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
    if header.alg != Algorithm::ES256 {
        return Err(AuthError::InvalidSignature);
    }
    let decoding_key = keys.es256_key(header.kid.as_deref()).await?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    if let Some(issuer) = &auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &auth_config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<PrivyClaims>(token, &decoding_key, &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => AuthError::ForeignToken,
            _ => AuthError::MalformedToken,
        })?;

    Ok(token_data.claims.into())
}

/// Development verification: no signature check.
fn verify_jwt_development(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<PrivyClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;
    let claims = token_data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    /// Unsigned token; only accepted in development mode.
    fn create_test_jwt(user_id: &str, exp: i64) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"ES256","typ":"JWT"}"#;
        let claims = format!(
            r#"{{"sub":"{user_id}","iat":1609459200,"exp":{exp},"iss":"privy.io","sid":"sess_123"}}"#
        );

        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.as_bytes());
        format!("{header_b64}.{claims_b64}.fake_signature")
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let state = AppState::for_tests();
        let result = Auth::from_request_parts(&mut parts(None), &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_non_bearer_scheme() {
        let state = AppState::for_tests();
        let result = Auth::from_request_parts(&mut parts(Some("Basic dXNlcjpwYXNz")), &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_jwt() {
        let state = AppState::for_tests();
        let token = create_test_jwt("did:privy:user_123", 9_999_999_999);
        let bearer = format!("Bearer {token}");

        let Auth(user) = Auth::from_request_parts(&mut parts(Some(&bearer)), &state)
            .await
            .unwrap();
        assert_eq!(user.user_id, "did:privy:user_123");
        assert_eq!(user.session_id.as_deref(), Some("sess_123"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let state = AppState::for_tests();
        let token = create_test_jwt("did:privy:user_123", 1_609_459_200);
        let bearer = format!("Bearer {token}");

        let result = Auth::from_request_parts(&mut parts(Some(&bearer)), &state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let state = AppState::for_tests();
        let result = Auth::from_request_parts(&mut parts(Some("Bearer not.a.jwt")), &state).await;
        assert!(matches!(result, Err(AuthError::MalformedToken)));
    }
}
