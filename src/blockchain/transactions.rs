// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed writes to the SBT contract: `mint` and `setTokenURI`.
//!
//! Both calls are sent through a wallet-filled provider and awaited until the
//! receipt arrives. There is no cancellation once a transaction is submitted.

use std::future::Future;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{PendingTransactionBuilder, ProviderBuilder},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
};

use super::client::ChainError;
use super::sbt::{to_u64, ISbt};
use super::types::{NetworkConfig, WriteReceipt};

/// Write side of the SBT contract, as seen by the certification flow.
pub trait CertificateWriter: Send + Sync {
    /// Mint a new certificate to `to` pointing at `token_uri`.
    fn mint(
        &self,
        to: Address,
        token_uri: &str,
    ) -> impl Future<Output = Result<WriteReceipt, ChainError>> + Send;

    /// Point an existing certificate at a new metadata URI.
    fn set_token_uri(
        &self,
        token_id: u64,
        token_uri: &str,
    ) -> impl Future<Output = Result<WriteReceipt, ChainError>> + Send;
}

type WalletProvider = alloy::providers::fillers::FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::fillers::JoinFill<
            alloy::providers::Identity,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::GasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::BlobGasFiller,
                    alloy::providers::fillers::JoinFill<
                        alloy::providers::fillers::NonceFiller,
                        alloy::providers::fillers::ChainIdFiller,
                    >,
                >,
            >,
        >,
        alloy::providers::fillers::WalletFiller<EthereumWallet>,
    >,
    alloy::providers::RootProvider<alloy::network::Ethereum>,
>;

/// Signing client for the SBT contract.
pub struct SbtWriter {
    network: NetworkConfig,
    contract: Address,
    minter: Address,
    provider: WalletProvider,
}

impl SbtWriter {
    /// Create a new writer with signing capabilities.
    pub fn new(
        network: NetworkConfig,
        contract: Address,
        signer: PrivateKeySigner,
    ) -> Result<Self, ChainError> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let minter = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        Ok(Self {
            network,
            contract,
            minter,
            provider,
        })
    }

    /// Address that signs the writes.
    pub fn minter(&self) -> Address {
        self.minter
    }

    /// Wait for a submitted transaction and turn its receipt into a
    /// [`WriteReceipt`]. A reverted receipt is an error.
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<alloy::network::Ethereum>,
    ) -> Result<WriteReceipt, ChainError> {
        let tx_hash = format!("{:#x}", pending.tx_hash());
        tracing::info!(tx_hash = %tx_hash, "Transaction submitted, waiting for receipt");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::TransactionFailed(format!("Failed to get receipt: {}", e)))?;

        let confirmed = confirmed_write(&receipt, self.contract, &self.network, tx_hash)?;
        tracing::info!(
            tx_hash = %confirmed.tx_hash,
            block_number = confirmed.block_number,
            minted_token_id = ?confirmed.minted_token_id,
            "Transaction confirmed"
        );
        Ok(confirmed)
    }
}

/// Turn a mined receipt into a [`WriteReceipt`]. A reverted receipt is an
/// error.
fn confirmed_write(
    receipt: &TransactionReceipt,
    contract: Address,
    network: &NetworkConfig,
    tx_hash: String,
) -> Result<WriteReceipt, ChainError> {
    if !receipt.status() {
        tracing::warn!(tx_hash = %tx_hash, "Transaction reverted");
        return Err(ChainError::Reverted(tx_hash));
    }

    Ok(WriteReceipt {
        explorer_url: network.tx_url(&tx_hash),
        tx_hash,
        block_number: receipt.block_number.unwrap_or(0),
        minted_token_id: minted_token_id(receipt, contract),
    })
}

impl CertificateWriter for SbtWriter {
    async fn mint(&self, to: Address, token_uri: &str) -> Result<WriteReceipt, ChainError> {
        let contract = ISbt::new(self.contract, self.provider.clone());
        let pending = contract
            .mint(to, token_uri.to_string())
            .send()
            .await
            .map_err(|e| ChainError::TransactionFailed(format!("Failed to send mint: {}", e)))?;

        self.confirm(pending).await
    }

    async fn set_token_uri(
        &self,
        token_id: u64,
        token_uri: &str,
    ) -> Result<WriteReceipt, ChainError> {
        let contract = ISbt::new(self.contract, self.provider.clone());
        let pending = contract
            .setTokenURI(U256::from(token_id), token_uri.to_string())
            .send()
            .await
            .map_err(|e| {
                ChainError::TransactionFailed(format!("Failed to send setTokenURI: {}", e))
            })?;

        self.confirm(pending).await
    }
}

/// Token id of the first mint (`Transfer` from the zero address) emitted by
/// `contract` in a receipt.
fn minted_token_id(receipt: &TransactionReceipt, contract: Address) -> Option<u64> {
    receipt
        .inner
        .logs()
        .iter()
        .filter(|log| log.address() == contract)
        .filter_map(|log| log.log_decode::<ISbt::Transfer>().ok())
        .filter(|event| event.inner.data.from == Address::ZERO)
        .find_map(|event| to_u64(event.inner.data.tokenId).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use alloy::sol_types::SolEvent;
    use serde_json::{json, Value};

    const TX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
    const BLOCK: &str = "0x2222222222222222222222222222222222222222222222222222222222222222";

    fn contract() -> Address {
        Address::repeat_byte(0xcc)
    }

    fn word(address: Address) -> String {
        format!("{}", B256::left_padding_from(address.as_slice()))
    }

    fn transfer_log(emitter: Address, from: Address, to: Address, token_id: u64) -> Value {
        json!({
            "address": emitter,
            "topics": [
                format!("{}", ISbt::Transfer::SIGNATURE_HASH),
                word(from),
                word(to),
                format!("{}", B256::from(U256::from(token_id).to_be_bytes::<32>())),
            ],
            "data": "0x",
            "blockNumber": "0x2a",
            "blockHash": BLOCK,
            "transactionHash": TX,
            "transactionIndex": "0x0",
            "logIndex": "0x0",
            "removed": false
        })
    }

    fn mined(status: bool, logs: Vec<Value>) -> TransactionReceipt {
        serde_json::from_value(json!({
            "type": "0x2",
            "status": if status { "0x1" } else { "0x0" },
            "cumulativeGasUsed": "0x5208",
            "logs": logs,
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "transactionHash": TX,
            "transactionIndex": "0x0",
            "blockHash": BLOCK,
            "blockNumber": "0x2a",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "from": Address::repeat_byte(0x01),
            "to": contract(),
            "contractAddress": null
        }))
        .unwrap()
    }

    #[test]
    fn mint_receipt_yields_token_id() {
        let recipient = Address::repeat_byte(0x07);
        let receipt = mined(true, vec![transfer_log(contract(), Address::ZERO, recipient, 12)]);

        let write =
            confirmed_write(&receipt, contract(), &NetworkConfig::base_sepolia(), TX.into()).unwrap();
        assert_eq!(write.minted_token_id, Some(12));
        assert_eq!(write.block_number, 42);
        assert_eq!(write.explorer_url, format!("https://sepolia.basescan.org/tx/{TX}"));
    }

    #[test]
    fn transfers_from_other_contracts_or_owners_are_ignored() {
        let recipient = Address::repeat_byte(0x07);
        let receipt = mined(
            true,
            vec![
                transfer_log(Address::repeat_byte(0xdd), Address::ZERO, recipient, 99),
                transfer_log(contract(), Address::repeat_byte(0x05), recipient, 98),
                transfer_log(contract(), Address::ZERO, recipient, 13),
            ],
        );
        assert_eq!(minted_token_id(&receipt, contract()), Some(13));

        let receipt = mined(true, Vec::new());
        assert_eq!(minted_token_id(&receipt, contract()), None);
    }

    #[test]
    fn reverted_receipt_is_an_error() {
        let receipt = mined(false, Vec::new());
        let err = confirmed_write(&receipt, contract(), &NetworkConfig::base_sepolia(), TX.into())
            .unwrap_err();
        assert!(matches!(err, ChainError::Reverted(hash) if hash == TX));
    }
}
