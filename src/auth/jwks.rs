// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing keys of the embedded-wallet app.
//!
//! Access tokens are ES256 JWTs signed with a P-256 key published at
//! `https://auth.privy.io/api/v1/apps/<app id>/jwks.json` (see
//! [`privy_jwks_url`]). The key set is held for [`KEY_SET_TTL`]; when a
//! refresh fails the last key set keeps serving.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use tokio::sync::RwLock;

use super::error::AuthError;

pub const KEY_SET_TTL: Duration = Duration::from_secs(300);

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const PRIVY_AUTH_BASE: &str = "https://auth.privy.io/api/v1/apps";

/// JWKS endpoint of an embedded-wallet app.
pub fn privy_jwks_url(app_id: &str) -> String {
    format!("{PRIVY_AUTH_BASE}/{}/jwks.json", app_id.trim())
}

struct Loaded {
    keys: Arc<JwkSet>,
    at: Instant,
}

#[derive(Clone)]
pub struct PrivyKeySet {
    url: String,
    http: reqwest::Client,
    loaded: Arc<RwLock<Option<Loaded>>>,
}

impl PrivyKeySet {
    pub fn new(url: impl Into<String>) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(AuthError::HttpClient)?;
        Ok(Self {
            url: url.into(),
            http,
            loaded: Arc::new(RwLock::new(None)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// ES256 verification key for a token header's `kid`.
    ///
    /// Tokens without a `kid` are checked against the first P-256 key.
    pub async fn es256_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let keys = self.current().await?;
        let jwk = keys
            .keys
            .iter()
            .filter(|jwk| kid.is_none() || jwk.common.key_id.as_deref() == kid)
            .find(|jwk| is_p256(jwk))
            .ok_or(AuthError::UnknownSigningKey)?;
        let AlgorithmParameters::EllipticCurve(ec) = &jwk.algorithm else {
            return Err(AuthError::UnknownSigningKey);
        };
        DecodingKey::from_ec_components(&ec.x, &ec.y)
            .map_err(|e| AuthError::KeysUnavailable(format!("unusable P-256 key: {e}")))
    }

    /// Loads the key set unless a fresh one is held.
    pub async fn ensure_fresh(&self) -> Result<(), AuthError> {
        self.current().await.map(|_| ())
    }

    pub async fn is_fresh(&self) -> bool {
        self.loaded
            .read()
            .await
            .as_ref()
            .is_some_and(|loaded| loaded.at.elapsed() < KEY_SET_TTL)
    }

    async fn current(&self) -> Result<Arc<JwkSet>, AuthError> {
        if let Some(loaded) = &*self.loaded.read().await {
            if loaded.at.elapsed() < KEY_SET_TTL {
                return Ok(loaded.keys.clone());
            }
        }

        let mut loaded = self.loaded.write().await;
        // Another request may have refreshed while we waited.
        if let Some(held) = &*loaded {
            if held.at.elapsed() < KEY_SET_TTL {
                return Ok(held.keys.clone());
            }
        }

        match self.download().await {
            Ok(keys) => {
                let keys = Arc::new(keys);
                tracing::debug!(url = %self.url, count = keys.keys.len(), "Signing keys loaded");
                *loaded = Some(Loaded {
                    keys: keys.clone(),
                    at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => match &*loaded {
                Some(stale) => {
                    tracing::warn!(error = %e, "Signing key refresh failed; using the previous key set");
                    Ok(stale.keys.clone())
                }
                None => Err(e),
            },
        }
    }

    async fn download(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::KeysUnavailable(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }
        response
            .json()
            .await
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))
    }

    #[cfg(test)]
    async fn age_out(&self) {
        if let Some(loaded) = self.loaded.write().await.as_mut() {
            if let Some(past) = Instant::now().checked_sub(KEY_SET_TTL * 2) {
                loaded.at = past;
            }
        }
    }
}

fn is_p256(jwk: &Jwk) -> bool {
    matches!(
        &jwk.algorithm,
        AlgorithmParameters::EllipticCurve(ec) if ec.curve == EllipticCurve::P256
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};

    fn key_set() -> serde_json::Value {
        serde_json::json!({
            "keys": [
                {
                    "kty": "RSA",
                    "kid": "rsa-1",
                    "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
                    "e": "AQAB"
                },
                {
                    "kty": "EC",
                    "crv": "P-256",
                    "kid": "key-1",
                    "alg": "ES256",
                    "use": "sig",
                    "x": "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
                    "y": "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0"
                }
            ]
        })
    }

    #[test]
    fn privy_url_is_built_from_app_id() {
        assert_eq!(
            privy_jwks_url(" clx123 "),
            "https://auth.privy.io/api/v1/apps/clx123/jwks.json"
        );
    }

    #[tokio::test]
    async fn nothing_is_loaded_up_front() {
        let keys = PrivyKeySet::new(privy_jwks_url("app")).unwrap();
        assert!(!keys.is_fresh().await);
        assert_eq!(keys.url(), privy_jwks_url("app"));
    }

    #[tokio::test]
    async fn picks_p256_keys_only() {
        let app = Router::new().route("/jwks.json", get(|| async { Json(key_set()) }));
        let base = crate::ipfs::test_server::spawn(app).await;
        let keys = PrivyKeySet::new(format!("{base}/jwks.json")).unwrap();

        assert!(keys.es256_key(Some("key-1")).await.is_ok());
        assert!(keys.es256_key(None).await.is_ok());
        assert!(keys.is_fresh().await);

        assert!(matches!(
            keys.es256_key(Some("rsa-1")).await,
            Err(AuthError::UnknownSigningKey)
        ));
        assert!(matches!(
            keys.es256_key(Some("other")).await,
            Err(AuthError::UnknownSigningKey)
        ));
    }

    #[tokio::test]
    async fn stale_keys_serve_when_refresh_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/jwks.json",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Json(key_set()).into_response()
                    } else {
                        StatusCode::BAD_GATEWAY.into_response()
                    }
                }
            }),
        );
        let base = crate::ipfs::test_server::spawn(app).await;
        let keys = PrivyKeySet::new(format!("{base}/jwks.json")).unwrap();

        keys.ensure_fresh().await.unwrap();
        keys.age_out().await;

        assert!(keys.es256_key(Some("key-1")).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_endpoint_without_keys_is_unavailable() {
        let app = Router::new().route("/jwks.json", get(|| async { StatusCode::NOT_FOUND }));
        let base = crate::ipfs::test_server::spawn(app).await;
        let keys = PrivyKeySet::new(format!("{base}/jwks.json")).unwrap();

        assert!(matches!(
            keys.ensure_fresh().await,
            Err(AuthError::KeysUnavailable(_))
        ));
    }
}
