// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Process-wide cache for contract read results.
//!
//! Entries are keyed by call signature (`<contract>:<calldata>`) and hold the
//! raw ABI return bytes, so a single cache serves every view function. The
//! cache is cleared as a whole after a mint or versioning transaction.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, Bytes};
use lru::LruCache;

/// Time-to-live for cached read results.
pub const READ_CACHE_TTL: Duration = Duration::from_secs(15);

/// Upper bound on the number of cached calls.
pub const READ_CACHE_CAPACITY: usize = 4096;

struct CacheEntry {
    data: Bytes,
    inserted_at: Instant,
}

/// TTL cache for `eth_call` results.
pub struct ReadCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for ReadCache {
    fn default() -> Self {
        Self::new(READ_CACHE_CAPACITY, READ_CACHE_TTL)
    }
}

impl ReadCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Cache key for a call: target contract plus hex calldata.
    pub fn key(target: &Address, calldata: &[u8]) -> String {
        format!("{:#x}:{}", target, alloy::hex::encode(calldata))
    }

    /// Get a cached result. Returns `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.data.clone());
            }
            cache.pop(key);
        }
        None
    }

    /// Store a successful result.
    pub fn put(&self, key: String, data: Bytes) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    data,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its
    /// successful result. Failures are never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::trace!(key, "read cache hit");
            return Ok(hit);
        }
        let data = fetch().await?;
        self.put(key.to_string(), data.clone());
        Ok(data)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            let dropped = cache.len();
            cache.clear();
            tracing::debug!(dropped, "read cache cleared");
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
