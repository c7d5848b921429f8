// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by an embedded-wallet access token.
///
/// `sub` is the user DID (`did:privy:...`), `sid` the session id and `aud`
/// the app id the token was issued for.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivyClaims {
    pub sub: String,

    #[serde(default)]
    pub iat: i64,

    #[serde(default)]
    pub exp: i64,

    #[serde(default)]
    pub iss: String,

    /// Validated by `jsonwebtoken`; not read directly.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    #[serde(default)]
    pub sid: Option<String>,
}

/// Authenticated user information extracted from a JWT.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// User DID (`sub` claim)
    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip)]
    pub issuer: String,

    /// Unix timestamp
    #[serde(skip)]
    pub expires_at: i64,
}

impl From<PrivyClaims> for AuthenticatedUser {
    fn from(claims: PrivyClaims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.sid,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_map_to_user() {
        let claims: PrivyClaims = serde_json::from_str(
            r#"{"sub":"did:privy:abc","iat":1700000000,"exp":1700003600,
                "iss":"privy.io","aud":"app-1","sid":"sess_1"}"#,
        )
        .unwrap();
        let user = AuthenticatedUser::from(claims);
        assert_eq!(user.user_id, "did:privy:abc");
        assert_eq!(user.session_id.as_deref(), Some("sess_1"));
        assert_eq!(user.expires_at, 1700003600);
    }

    #[test]
    fn serialization_skips_internal_fields() {
        let user = AuthenticatedUser {
            user_id: "did:privy:abc".into(),
            session_id: None,
            issuer: "privy.io".into(),
            expires_at: 1,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json, serde_json::json!({ "user_id": "did:privy:abc" }));
    }
}
