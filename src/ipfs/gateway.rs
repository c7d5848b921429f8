// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway reads and the metadata fetch cache.
//!
//! [`MetadataCache`] memoizes parsed JSON per normalized CID for the life of
//! the process. Concurrent requests for one CID share a single fetch; a
//! failed fetch leaves the slot empty so the next request retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};

use super::cid::{gateway_url, normalize_cid};
use super::IpfsError;

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(20);

/// Anything that can fetch a JSON document by CID.
pub trait MetadataFetcher: Send + Sync {
    fn fetch_json(&self, cid: &str) -> impl Future<Output = Result<Value, IpfsError>> + Send;
}

/// Plain HTTP client for `https://<gateway>/ipfs/<cid>`.
#[derive(Clone)]
pub struct GatewayClient {
    gateway: String,
    client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(gateway: impl Into<String>) -> Result<Self, IpfsError> {
        let client = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()?;
        Ok(Self {
            gateway: gateway.into(),
            client,
        })
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }
}

impl MetadataFetcher for GatewayClient {
    async fn fetch_json(&self, cid: &str) -> Result<Value, IpfsError> {
        let url = gateway_url(&self.gateway, cid);
        tracing::debug!(%url, "Fetching metadata from gateway");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IpfsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IpfsError::InvalidResponse(format!("{cid} is not JSON: {e}")))
    }
}

type Slot = Arc<OnceCell<Arc<Value>>>;

/// Process-wide metadata cache keyed by normalized CID. No eviction.
pub struct MetadataCache<F = GatewayClient> {
    fetcher: F,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<F: MetadataFetcher> MetadataCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Metadata for any IPFS reference (`ipfs://`, gateway URL, bare CID).
    pub async fn get(&self, reference: &str) -> Result<Arc<Value>, IpfsError> {
        let cid = normalize_cid(reference)
            .ok_or_else(|| IpfsError::InvalidCid(reference.to_string()))?;

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(cid.clone()).or_default().clone()
        };

        let fetched = slot
            .get_or_try_init(|| async {
                let value = self.fetcher.fetch_json(&cid).await.inspect_err(|e| {
                    tracing::warn!(%cid, error = %e, "Metadata fetch failed");
                })?;
                Ok::<_, IpfsError>(Arc::new(value))
            })
            .await;

        match fetched {
            Ok(value) => Ok(Arc::clone(value)),
            Err(e) => {
                self.forget_unresolved(&cid, &slot).await;
                Err(e)
            }
        }
    }

    /// Drop `slot` from the map unless a concurrent caller has since
    /// resolved it or replaced it.
    async fn forget_unresolved(&self, cid: &str, slot: &Slot) {
        let mut slots = self.slots.lock().await;
        if slots
            .get(cid)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized())
        {
            slots.remove(cid);
        }
    }

    /// Number of CID slots held, resolved or in flight.
    pub async fn slot_count(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Number of CIDs with a resolved document.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}
