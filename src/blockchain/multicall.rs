// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Batched `ownerOf` / `tokenURI` reads over Multicall3.
//!
//! Token ids are split into batches of [`MULTICALL_BATCH_SIZE`]; each batch is
//! one `aggregate3` round trip carrying an `ownerOf` and a `tokenURI` call per
//! token, all with `allowFailure = true`. A reverted call only blanks its own
//! field. A batch whose round trip fails leaves its tokens unresolved and the
//! remaining batches still run.

use std::future::Future;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use super::client::ChainError;
use super::read_cache::ReadCache;
use super::sbt::{call3, decode_result, IMulticall3, ISbt};
use super::types::TokenRead;

/// Number of tokens per `aggregate3` call.
pub const MULTICALL_BATCH_SIZE: usize = 50;

/// Anything that can execute an `aggregate3` round trip.
pub trait MulticallTransport: Send + Sync {
    fn aggregate3(
        &self,
        calls: Vec<IMulticall3::Call3>,
    ) -> impl Future<Output = Result<Vec<IMulticall3::Call3Result>, ChainError>> + Send;
}

/// Read owner and URI for every id in `token_ids`.
///
/// Results come back in input order. Successful individual results are also
/// written to `cache` so later single reads are served without a round trip.
pub async fn fetch_owners_and_uris<T: MulticallTransport>(
    transport: &T,
    contract: Address,
    token_ids: &[u64],
    cache: Option<&ReadCache>,
) -> Vec<TokenRead> {
    let mut reads = Vec::with_capacity(token_ids.len());

    for (batch_index, batch) in token_ids.chunks(MULTICALL_BATCH_SIZE).enumerate() {
        let mut calls = Vec::with_capacity(batch.len() * 2);
        let mut encoded = Vec::with_capacity(batch.len() * 2);
        for &token_id in batch {
            let owner_call = ISbt::ownerOfCall {
                tokenId: U256::from(token_id),
            };
            let uri_call = ISbt::tokenURICall {
                tokenId: U256::from(token_id),
            };
            calls.push(call3(contract, &owner_call));
            calls.push(call3(contract, &uri_call));
            encoded.push(owner_call.abi_encode());
            encoded.push(uri_call.abi_encode());
        }

        let results = match transport.aggregate3(calls).await {
            Ok(results) if results.len() == batch.len() * 2 => results,
            Ok(results) => {
                tracing::warn!(
                    batch = batch_index,
                    expected = batch.len() * 2,
                    got = results.len(),
                    "Multicall returned an unexpected number of results"
                );
                reads.extend(batch.iter().map(|&token_id| unresolved(token_id)));
                continue;
            }
            Err(e) => {
                tracing::warn!(
                    batch = batch_index,
                    size = batch.len(),
                    error = %e,
                    "Multicall batch failed, continuing with next batch"
                );
                reads.extend(batch.iter().map(|&token_id| unresolved(token_id)));
                continue;
            }
        };

        for (i, &token_id) in batch.iter().enumerate() {
            let owner_result = &results[i * 2];
            let uri_result = &results[i * 2 + 1];

            let owner = decode_result::<ISbt::ownerOfCall>(owner_result);
            let token_uri = decode_result::<ISbt::tokenURICall>(uri_result);

            if let Some(cache) = cache {
                remember(cache, &contract, &encoded[i * 2], owner.is_some(), owner_result);
                remember(cache, &contract, &encoded[i * 2 + 1], token_uri.is_some(), uri_result);
            }

            reads.push(TokenRead {
                token_id,
                owner,
                token_uri,
            });
        }
    }

    reads
}

fn unresolved(token_id: u64) -> TokenRead {
    TokenRead {
        token_id,
        owner: None,
        token_uri: None,
    }
}

fn remember(
    cache: &ReadCache,
    contract: &Address,
    calldata: &[u8],
    decoded: bool,
    result: &IMulticall3::Call3Result,
) {
    if decoded {
        cache.put(
            ReadCache::key(contract, calldata),
            Bytes::clone(&result.returnData),
        );
    }
}
