// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{privy_jwks_url, AuthError, PrivyKeySet};
use crate::blockchain::{signing, ChainError, ReadCache, SbtClient, SbtWriter};
use crate::config::{AppConfig, ConfigError};
use crate::ipfs::{GatewayClient, IpfsError, MetadataCache, PinataClient};
use crate::projects::{ProjectCacheError, ProjectNameCache};

/// Issuer of embedded-wallet access tokens.
pub const PRIVY_ISSUER: &str = "privy.io";

/// How access tokens are verified.
///
/// With `jwks` unset the server is in development mode.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub jwks: Option<PrivyKeySet>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn from_privy_app_id(app_id: Option<&str>) -> Result<Self, AuthError> {
        let Some(app_id) = app_id else {
            return Ok(Self::default());
        };
        Ok(Self {
            jwks: Some(PrivyKeySet::new(privy_jwks_url(app_id))?),
            issuer: Some(PRIVY_ISSUER.to_string()),
            audience: Some(app_id.to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.jwks.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Chain client: {0}")]
    Chain(#[from] ChainError),

    #[error("IPFS client: {0}")]
    Ipfs(#[from] IpfsError),

    #[error("Authentication: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Projects(#[from] ProjectCacheError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chain: Arc<SbtClient>,
    /// Present only when a minter key is configured.
    pub writer: Option<Arc<SbtWriter>>,
    /// Present only when a pinning JWT is configured.
    pub pinata: Option<Arc<PinataClient>>,
    pub metadata: Arc<MetadataCache>,
    pub projects: Arc<ProjectNameCache>,
    pub auth_config: Arc<AuthConfig>,
}

impl AppState {
    /// Build every client from configuration. Nothing here touches the
    /// network.
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let chain = SbtClient::new(
            config.network.clone(),
            config.sbt_contract,
            config.multicall3,
            Arc::new(ReadCache::default()),
        )?;

        let auth_config = AuthConfig::from_privy_app_id(config.privy_app_id.as_deref())?;
        let unverified = !auth_config.is_production();
        if unverified {
            tracing::warn!("PRIVY_APP_ID not set: JWT signatures are NOT verified (development mode)");
        }
        let refuse_writes = unverified && !config.allow_unverified_writes;

        let writer = match &config.minter_key {
            Some(_) if refuse_writes => None,
            Some(source) => {
                let signer = signing::load_minter(source)?;
                let writer = SbtWriter::new(config.network.clone(), config.sbt_contract, signer)?;
                tracing::info!(minter = %writer.minter(), "Minter key loaded");
                Some(Arc::new(writer))
            }
            None => None,
        };

        let pinata = match &config.pinata_jwt {
            Some(_) if refuse_writes => None,
            Some(jwt) => Some(Arc::new(PinataClient::new(&config.pinata_api_url, jwt)?)),
            None => None,
        };

        if refuse_writes && config.writes_enabled() {
            tracing::warn!(
                "Write endpoints disabled: unsigned tokens are accepted without PRIVY_APP_ID (set ALLOW_UNVERIFIED_WRITES=true to override)"
            );
        } else if writer.is_none() || pinata.is_none() {
            tracing::warn!("Minter key or pinning JWT missing: write endpoints are disabled");
        } else if config.issuer_user_ids.is_empty() {
            tracing::warn!("ISSUER_USER_IDS is empty: every write request will be refused");
        }

        let metadata = MetadataCache::new(GatewayClient::new(&config.ipfs_gateway)?);

        let projects = match &config.data_dir {
            Some(dir) => ProjectNameCache::open(dir)?,
            None => ProjectNameCache::in_memory(),
        };

        Ok(Self {
            config: Arc::new(config),
            chain: Arc::new(chain),
            writer,
            pinata,
            metadata: Arc::new(metadata),
            projects: Arc::new(projects),
            auth_config: Arc::new(auth_config),
        })
    }

    /// Signer and pinning client, when both are configured.
    pub fn write_clients(&self) -> Option<(&SbtWriter, &PinataClient)> {
        Some((self.writer.as_deref()?, self.pinata.as_deref()?))
    }

    /// Development-mode state whose chain RPC points at a closed local
    /// port; writes are disabled.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::for_tests_with(&[])
    }

    /// [`Self::for_tests`] with extra environment values.
    #[cfg(test)]
    pub fn for_tests_with(vars: &[(&str, &str)]) -> Self {
        let config = AppConfig::from_lookup(|name| {
            if let Some((_, value)) = vars.iter().find(|(key, _)| *key == name) {
                return Some(value.to_string());
            }
            match name {
                crate::config::SBT_CONTRACT_ENV => {
                    Some("0x1111111111111111111111111111111111111111".to_string())
                }
                crate::config::RPC_URL_ENV => Some("http://127.0.0.1:9".to_string()),
                _ => None,
            }
        })
        .unwrap();
        Self::from_config(config).unwrap()
    }
}
