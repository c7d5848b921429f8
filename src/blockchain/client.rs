// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only client for the certification SBT contract.

use std::future::Future;
use std::sync::Arc;

use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};

use super::multicall::{fetch_owners_and_uris, MulticallTransport};
use super::read_cache::ReadCache;
use super::sbt::{to_u64, IMulticall3, ISbt};
use super::types::{NetworkConfig, TokenRead};

/// HTTP provider type (with all fillers).
pub(crate) type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// View calls on the SBT contract.
pub trait SbtReader: Send + Sync {
    /// Number of certificates minted so far.
    fn total_supply(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Id the next mint will receive (`totalSupply + 1`).
    fn next_token_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send {
        async move { Ok(self.total_supply().await? + 1) }
    }

    fn owner_of(&self, token_id: u64) -> impl Future<Output = Result<Address, ChainError>> + Send;

    fn token_uri(&self, token_id: u64)
        -> impl Future<Output = Result<String, ChainError>> + Send;

    /// Number of certificates held by `owner`.
    fn balance_of(&self, owner: Address) -> impl Future<Output = Result<u64, ChainError>> + Send;

    /// Owner and URI for every id, in input order. Individual failures are
    /// `None` fields rather than errors.
    fn owners_and_uris(&self, token_ids: &[u64]) -> impl Future<Output = Vec<TokenRead>> + Send;

    /// Drop every cached read (after a write lands).
    fn invalidate_cache(&self);
}

/// Read client for the SBT contract, backed by the shared [`ReadCache`].
pub struct SbtClient {
    /// SBT contract address
    contract: Address,
    /// Multicall3 contract address
    multicall: Address,
    /// Alloy HTTP provider
    provider: HttpProvider,
    /// Process-wide read cache
    cache: Arc<ReadCache>,
}

impl SbtClient {
    /// Create a new client. No network traffic happens until the first read.
    pub fn new(
        network: NetworkConfig,
        contract: Address,
        multicall: Address,
        cache: Arc<ReadCache>,
    ) -> Result<Self, ChainError> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            contract,
            multicall,
            provider,
            cache,
        })
    }

    /// Run a view call through the read cache.
    async fn cached_call<C: SolCall>(&self, call: C) -> Result<C::Return, ChainError> {
        let calldata = call.abi_encode();
        let key = ReadCache::key(&self.contract, &calldata);

        let raw = self
            .cache
            .get_or_fetch(&key, || async {
                let tx = TransactionRequest::default()
                    .to(self.contract)
                    .input(calldata.clone().into());
                self.provider
                    .call(tx)
                    .await
                    .map_err(|e| ChainError::from_rpc(e.to_string()))
            })
            .await?;

        C::abi_decode_returns(&raw).map_err(|e| ChainError::Decode(e.to_string()))
    }

    /// Get the current block number.
    pub async fn get_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::from_rpc(e.to_string()))
    }

    /// Shared read cache.
    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }
}

impl SbtReader for SbtClient {
    async fn total_supply(&self) -> Result<u64, ChainError> {
        let supply: U256 = self.cached_call(ISbt::totalSupplyCall {}).await?;
        to_u64(supply)
    }

    async fn owner_of(&self, token_id: u64) -> Result<Address, ChainError> {
        self.cached_call(ISbt::ownerOfCall {
            tokenId: U256::from(token_id),
        })
        .await
    }

    async fn token_uri(&self, token_id: u64) -> Result<String, ChainError> {
        self.cached_call(ISbt::tokenURICall {
            tokenId: U256::from(token_id),
        })
        .await
    }

    async fn balance_of(&self, owner: Address) -> Result<u64, ChainError> {
        let balance: U256 = self.cached_call(ISbt::balanceOfCall { owner }).await?;
        to_u64(balance)
    }

    async fn owners_and_uris(&self, token_ids: &[u64]) -> Vec<TokenRead> {
        fetch_owners_and_uris(self, self.contract, token_ids, Some(&self.cache)).await
    }

    fn invalidate_cache(&self) {
        self.cache.clear();
    }
}

impl MulticallTransport for SbtClient {
    async fn aggregate3(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> Result<Vec<IMulticall3::Call3Result>, ChainError> {
        let multicall = IMulticall3::new(self.multicall, self.provider.clone());
        multicall
            .aggregate3(calls)
            .call()
            .await
            .map_err(|e| ChainError::from_rpc(e.to_string()))
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC rate limit reached, try again shortly: {0}")]
    RateLimited(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Could not decode contract response: {0}")]
    Decode(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Transaction {0} reverted")]
    Reverted(String),
}

impl ChainError {
    /// Classify a transport error message, separating rate limiting from
    /// other RPC failures.
    pub fn from_rpc(message: String) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
        {
            ChainError::RateLimited(message)
        } else {
            ChainError::RpcError(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::MULTICALL3_ADDRESS;

    #[test]
    fn rate_limits_are_classified() {
        assert!(matches!(
            ChainError::from_rpc("HTTP error 429 with body: Too Many Requests".into()),
            ChainError::RateLimited(_)
        ));
        assert!(matches!(
            ChainError::from_rpc("connection refused".into()),
            ChainError::RpcError(_)
        ));
    }

    #[test]
    fn invalid_rpc_url_is_rejected() {
        let network = NetworkConfig::new(8453, "not a url", "https://basescan.org");
        let result = SbtClient::new(
            network,
            Address::repeat_byte(1),
            MULTICALL3_ADDRESS,
            Arc::new(ReadCache::default()),
        );
        assert!(matches!(result, Err(ChainError::InvalidRpcUrl(_))));
    }

    #[tokio::test]
    async fn cached_reads_skip_the_network() {
        // Nothing listens on this port; a cache hit must not touch it.
        let network = NetworkConfig::new(8453, "http://127.0.0.1:9", "https://basescan.org");
        let contract = Address::repeat_byte(1);
        let cache = Arc::new(ReadCache::default());
        let client = SbtClient::new(network, contract, MULTICALL3_ADDRESS, cache.clone()).unwrap();

        let call = ISbt::tokenURICall {
            tokenId: U256::from(3u64),
        };
        let encoded = ISbt::tokenURICall::abi_encode_returns(&"ipfs://cached".to_string());
        cache.put(ReadCache::key(&contract, &call.abi_encode()), Bytes::from(encoded));

        assert_eq!(client.token_uri(3).await.unwrap(), "ipfs://cached");

        client.invalidate_cache();
        assert!(client.token_uri(3).await.is_err());
    }
}
