// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Base mainnet chain id.
pub const BASE_MAINNET_CHAIN_ID: u64 = 8453;

/// Base Sepolia testnet chain id.
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

/// Canonical Multicall3 deployment (same address on every EVM chain).
pub const MULTICALL3_ADDRESS: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Block explorer URL (no trailing slash)
    pub explorer_url: String,
}

impl NetworkConfig {
    pub fn new(chain_id: u64, rpc_url: impl Into<String>, explorer_url: impl Into<String>) -> Self {
        Self {
            name: network_name(chain_id),
            chain_id,
            rpc_url: rpc_url.into(),
            explorer_url: explorer_url.into(),
        }
    }

    /// Base mainnet with the public RPC endpoint.
    pub fn base_mainnet() -> Self {
        Self::new(
            BASE_MAINNET_CHAIN_ID,
            "https://mainnet.base.org",
            "https://basescan.org",
        )
    }

    /// Base Sepolia with the public RPC endpoint.
    pub fn base_sepolia() -> Self {
        Self::new(
            BASE_SEPOLIA_CHAIN_ID,
            "https://sepolia.base.org",
            "https://sepolia.basescan.org",
        )
    }

    /// Explorer link for a transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    /// Explorer link for a single token of an NFT contract.
    pub fn token_url(&self, contract: &Address, token_id: u64) -> String {
        format!("{}/nft/{}/{}", self.explorer_url, contract, token_id)
    }
}

fn network_name(chain_id: u64) -> String {
    match chain_id {
        BASE_MAINNET_CHAIN_ID => "Base".to_string(),
        BASE_SEPOLIA_CHAIN_ID => "Base Sepolia".to_string(),
        other => format!("EVM chain {other}"),
    }
}

/// Owner and URI of a single token, as read from the contract.
///
/// Either field is `None` when its individual call failed inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenRead {
    pub token_id: u64,
    #[schema(value_type = Option<String>)]
    pub owner: Option<Address>,
    pub token_uri: Option<String>,
}

/// Confirmed write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Transaction hash (0x-prefixed)
    pub tx_hash: String,
    /// Explorer URL for the transaction
    pub explorer_url: String,
    /// Block number where the transaction was included
    pub block_number: u64,
    /// Token id from the `Transfer` event, when the write minted one
    pub minted_token_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chains_have_names() {
        assert_eq!(NetworkConfig::base_mainnet().name, "Base");
        assert_eq!(NetworkConfig::base_sepolia().name, "Base Sepolia");
        assert_eq!(
            NetworkConfig::new(1, "http://localhost:8545", "https://etherscan.io").name,
            "EVM chain 1"
        );
    }

    #[test]
    fn explorer_links() {
        let network = NetworkConfig::base_sepolia();
        assert_eq!(
            network.tx_url("0xabc"),
            "https://sepolia.basescan.org/tx/0xabc"
        );

        let contract = Address::repeat_byte(0x11);
        assert_eq!(
            network.token_url(&contract, 7),
            format!("https://sepolia.basescan.org/nft/{contract}/7")
        );
    }
}
