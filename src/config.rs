// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the [`AppConfig`] loaded once
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PRIVY_APP_ID` | Embedded-wallet app id (enables JWT verification) | unset (development auth) |
//! | `BASE_RPC_URL` | Chain RPC endpoint | `https://mainnet.base.org` |
//! | `CHAIN_ID` | Chain id | `8453` |
//! | `BLOCK_EXPLORER_URL` | Block explorer base URL | `https://basescan.org` |
//! | `SBT_CONTRACT_ADDRESS` | Certification SBT contract | Required |
//! | `MULTICALL3_ADDRESS` | Multicall3 contract | canonical deployment |
//! | `IPFS_GATEWAY` | IPFS gateway host | `gateway.pinata.cloud` |
//! | `PINATA_JWT` | Pinning API JWT | unset (writes disabled) |
//! | `PINATA_API_URL` | Pinning API base URL | `https://api.pinata.cloud` |
//! | `MINTER_PRIVATE_KEY` | Hex key used to sign writes | unset (writes disabled) |
//! | `MINTER_KEY_PEM_PATH` | PEM key file used to sign writes | unset |
//! | `ISSUER_USER_IDS` | Comma-separated user DIDs allowed to mint and version | unset (nobody) |
//! | `ALLOW_UNVERIFIED_WRITES` | Keep writes enabled without `PRIVY_APP_ID` | `false` |
//! | `DATA_DIR` | Directory for the project-name cache file | unset (memory only) |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | unset (plain HTTP) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;

use alloy::primitives::Address;

use crate::blockchain::{NetworkConfig, MULTICALL3_ADDRESS};

pub const PRIVY_APP_ID_ENV: &str = "PRIVY_APP_ID";
pub const RPC_URL_ENV: &str = "BASE_RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const EXPLORER_URL_ENV: &str = "BLOCK_EXPLORER_URL";
pub const SBT_CONTRACT_ENV: &str = "SBT_CONTRACT_ADDRESS";
pub const MULTICALL3_ENV: &str = "MULTICALL3_ADDRESS";
pub const IPFS_GATEWAY_ENV: &str = "IPFS_GATEWAY";
pub const PINATA_JWT_ENV: &str = "PINATA_JWT";
pub const PINATA_API_URL_ENV: &str = "PINATA_API_URL";
pub const MINTER_PRIVATE_KEY_ENV: &str = "MINTER_PRIVATE_KEY";
pub const MINTER_KEY_PEM_PATH_ENV: &str = "MINTER_KEY_PEM_PATH";

/// Users allowed to mint and version. Every write is signed by the same
/// minter key, so this list is the only thing standing between a signed-in
/// user and the contract.
pub const ISSUER_USER_IDS_ENV: &str = "ISSUER_USER_IDS";

/// Development auth accepts unsigned tokens; writes stay off unless this
/// is set.
pub const ALLOW_UNVERIFIED_WRITES_ENV: &str = "ALLOW_UNVERIFIED_WRITES";

/// Environment variable name for the data directory path.
///
/// Only the project-name cache is written here. When unset the cache lives
/// in memory for the lifetime of the process.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";
pub const DEFAULT_CHAIN_ID: u64 = 8453;
pub const DEFAULT_EXPLORER_URL: &str = "https://basescan.org";
pub const DEFAULT_IPFS_GATEWAY: &str = "gateway.pinata.cloud";
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const REDACTED: &str = "<redacted>";

/// Where the minter key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum MinterKeySource {
    /// Hex-encoded secp256k1 key (with or without `0x`).
    Hex(String),
    /// PKCS#8 / SEC1 PEM file on disk.
    PemFile(PathBuf),
}

impl fmt::Debug for MinterKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinterKeySource::Hex(_) => f.debug_tuple("Hex").field(&REDACTED).finish(),
            MinterKeySource::PemFile(path) => f.debug_tuple("PemFile").field(path).finish(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Fully resolved service configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub privy_app_id: Option<String>,
    pub network: NetworkConfig,
    pub sbt_contract: Address,
    pub multicall3: Address,
    pub ipfs_gateway: String,
    pub pinata_jwt: Option<String>,
    pub pinata_api_url: String,
    pub minter_key: Option<MinterKeySource>,
    pub issuer_user_ids: Vec<String>,
    pub allow_unverified_writes: bool,
    pub data_dir: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub tls: Option<(PathBuf, PathBuf)>,
    pub log_format: LogFormat,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("privy_app_id", &self.privy_app_id)
            .field("network", &self.network)
            .field("sbt_contract", &self.sbt_contract)
            .field("multicall3", &self.multicall3)
            .field("ipfs_gateway", &self.ipfs_gateway)
            .field("pinata_jwt", &self.pinata_jwt.as_ref().map(|_| REDACTED))
            .field("pinata_api_url", &self.pinata_api_url)
            .field("minter_key", &self.minter_key)
            .field("issuer_user_ids", &self.issuer_user_ids)
            .field("allow_unverified_writes", &self.allow_unverified_writes)
            .field("data_dir", &self.data_dir)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Configuration errors raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let chain_id = match get(CHAIN_ID_ENV) {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: CHAIN_ID_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_CHAIN_ID,
        };

        let rpc_url = get(RPC_URL_ENV).unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        url::Url::parse(&rpc_url).map_err(|e| ConfigError::Invalid {
            name: RPC_URL_ENV,
            reason: e.to_string(),
        })?;
        let explorer_url = get(EXPLORER_URL_ENV)
            .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let network = NetworkConfig::new(chain_id, rpc_url, explorer_url);

        let sbt_contract = parse_address(
            SBT_CONTRACT_ENV,
            &get(SBT_CONTRACT_ENV).ok_or(ConfigError::Missing(SBT_CONTRACT_ENV))?,
        )?;
        let multicall3 = match get(MULTICALL3_ENV) {
            Some(raw) => parse_address(MULTICALL3_ENV, &raw)?,
            None => MULTICALL3_ADDRESS,
        };

        let minter_key = match (get(MINTER_PRIVATE_KEY_ENV), get(MINTER_KEY_PEM_PATH_ENV)) {
            (Some(hex), _) => Some(MinterKeySource::Hex(hex)),
            (None, Some(path)) => Some(MinterKeySource::PemFile(PathBuf::from(path))),
            (None, None) => None,
        };

        let issuer_user_ids: Vec<String> = get(ISSUER_USER_IDS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let allow_unverified_writes = match get(ALLOW_UNVERIFIED_WRITES_ENV) {
            Some(raw) => parse_flag(ALLOW_UNVERIFIED_WRITES_ENV, &raw)?,
            None => false,
        };

        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::to_ascii_lowercase) {
            Some(ref f) if f == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            privy_app_id: get(PRIVY_APP_ID_ENV),
            network,
            sbt_contract,
            multicall3,
            ipfs_gateway: get(IPFS_GATEWAY_ENV).unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string()),
            pinata_jwt: get(PINATA_JWT_ENV),
            pinata_api_url: get(PINATA_API_URL_ENV)
                .unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string()),
            minter_key,
            issuer_user_ids,
            allow_unverified_writes,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            tls,
            log_format,
        })
    }

    /// Whether the write path (pinning + signing) is fully configured.
    pub fn writes_enabled(&self) -> bool {
        self.pinata_jwt.is_some() && self.minter_key.is_some()
    }

    pub fn is_issuer(&self, user_id: &str) -> bool {
        self.issuer_user_ids.iter().any(|id| id == user_id)
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected true or false, got {other:?}"),
        }),
    }
}

fn parse_address(name: &'static str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse::<Address>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CONTRACT: &str = "0x1111111111111111111111111111111111111111";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_contract_is_set() {
        let config = AppConfig::from_lookup(lookup(&[(SBT_CONTRACT_ENV, CONTRACT)])).unwrap();

        assert_eq!(config.network.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.network.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.network.name, "Base");
        assert_eq!(config.ipfs_gateway, DEFAULT_IPFS_GATEWAY);
        assert_eq!(config.multicall3, MULTICALL3_ADDRESS);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.privy_app_id.is_none());
        assert!(!config.writes_enabled());
    }

    #[test]
    fn contract_address_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(SBT_CONTRACT_ENV)));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = AppConfig::from_lookup(lookup(&[(SBT_CONTRACT_ENV, "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(SBT_CONTRACT_ENV)));
    }

    #[test]
    fn invalid_contract_address_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(SBT_CONTRACT_ENV, "0x1234")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: SBT_CONTRACT_ENV, .. }));
    }

    #[test]
    fn writes_need_pinata_and_minter_key() {
        let config = AppConfig::from_lookup(lookup(&[
            (SBT_CONTRACT_ENV, CONTRACT),
            (PINATA_JWT_ENV, "jwt"),
            (MINTER_PRIVATE_KEY_ENV, "0xabc"),
            (CHAIN_ID_ENV, "84532"),
            (LOG_FORMAT_ENV, "JSON"),
        ]))
        .unwrap();

        assert!(config.writes_enabled());
        assert_eq!(config.network.name, "Base Sepolia");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.minter_key,
            Some(MinterKeySource::Hex("0xabc".to_string()))
        );
    }

    #[test]
    fn issuers_and_write_opt_in() {
        let config = AppConfig::from_lookup(lookup(&[
            (SBT_CONTRACT_ENV, CONTRACT),
            (ISSUER_USER_IDS_ENV, " did:privy:a, ,did:privy:b "),
            (ALLOW_UNVERIFIED_WRITES_ENV, "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.issuer_user_ids, ["did:privy:a", "did:privy:b"]);
        assert!(config.is_issuer("did:privy:b"));
        assert!(!config.is_issuer("did:privy:c"));
        assert!(config.allow_unverified_writes);

        let err = AppConfig::from_lookup(lookup(&[
            (SBT_CONTRACT_ENV, CONTRACT),
            (ALLOW_UNVERIFIED_WRITES_ENV, "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ALLOW_UNVERIFIED_WRITES_ENV, .. }));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = AppConfig::from_lookup(lookup(&[
            (SBT_CONTRACT_ENV, CONTRACT),
            (PINATA_JWT_ENV, "pinata-secret-jwt"),
            (MINTER_PRIVATE_KEY_ENV, "0xdeadbeefcafe"),
        ]))
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("pinata-secret-jwt"));
        assert!(!debug.contains("deadbeefcafe"));
        assert!(debug.contains(REDACTED));
    }

    #[test]
    fn tls_requires_both_paths() {
        let err = AppConfig::from_lookup(lookup(&[
            (SBT_CONTRACT_ENV, CONTRACT),
            (TLS_CERT_PATH_ENV, "/certs/cert.pem"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(TLS_KEY_PATH_ENV)));
    }
}
