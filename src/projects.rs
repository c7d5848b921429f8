// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-wallet project names, kept for 24 hours.
//!
//! Used for autocomplete of `form_data.project_name`. Keys are lower-cased
//! wallet addresses. When a file path is configured the whole map is
//! rewritten to it (write to a temp file, then rename) after each change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub const PROJECT_CACHE_FILE: &str = "project_names.json";
pub const PROJECT_CACHE_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum ProjectCacheError {
    #[error("Project cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Project cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectEntry {
    names: Vec<String>,
    stored_at: DateTime<Utc>,
}

pub struct ProjectNameCache {
    entries: RwLock<HashMap<String, ProjectEntry>>,
    file: Option<PathBuf>,
    ttl: TimeDelta,
}

fn key(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Trimmed, non-empty, de-duplicated case-insensitively (first spelling wins).
fn dedup(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() || out.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}

impl ProjectNameCache {
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            file: None,
            ttl: TimeDelta::hours(PROJECT_CACHE_TTL_HOURS),
        }
    }

    /// Cache backed by `<data_dir>/project_names.json`, loading what is
    /// already there.
    pub fn open(data_dir: &Path) -> Result<Self, ProjectCacheError> {
        std::fs::create_dir_all(data_dir)?;
        let file = data_dir.join(PROJECT_CACHE_FILE);

        let entries: HashMap<String, ProjectEntry> = match std::fs::read(&file) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(path = %file.display(), wallets = entries.len(), "Loaded project-name cache");

        Ok(Self {
            entries: RwLock::new(entries),
            file: Some(file),
            ttl: TimeDelta::hours(PROJECT_CACHE_TTL_HOURS),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.file.is_some()
    }

    fn persist(&self, entries: &HashMap<String, ProjectEntry>) -> Result<(), ProjectCacheError> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let tmp = file.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, file)?;
        Ok(())
    }

    /// Names stored for `address`; empty when absent or older than 24h.
    /// Expired entries are dropped.
    pub async fn read_at(&self, address: &str, now: DateTime<Utc>) -> Vec<String> {
        let key = key(address);
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                None => return Vec::new(),
                Some(entry) if now - entry.stored_at < self.ttl => return entry.names.clone(),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&key)
            .is_some_and(|entry| now - entry.stored_at >= self.ttl)
        {
            entries.remove(&key);
            tracing::debug!(address = %key, "Project-name entry expired");
            if let Err(e) = self.persist(&entries) {
                tracing::warn!(error = %e, "Could not persist project-name cache");
            }
        }
        Vec::new()
    }

    /// Replace the names stored for `address`.
    pub async fn write_at(
        &self,
        address: &str,
        names: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ProjectCacheError> {
        let names = dedup(names);
        let mut entries = self.entries.write().await;
        entries.insert(
            key(address),
            ProjectEntry {
                names: names.clone(),
                stored_at: now,
            },
        );
        self.persist(&entries)?;
        Ok(names)
    }

    /// Add one name to what is stored for `address` (an expired entry
    /// starts over) and refresh its timestamp. Merge and persist happen
    /// under one write guard.
    pub async fn remember_at(
        &self,
        address: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ProjectCacheError> {
        let key = key(address);
        let mut entries = self.entries.write().await;

        let mut names = match entries.get(&key) {
            Some(entry) if now - entry.stored_at < self.ttl => entry.names.clone(),
            _ => Vec::new(),
        };
        names.push(name.to_string());
        let names = dedup(names);

        entries.insert(
            key,
            ProjectEntry {
                names: names.clone(),
                stored_at: now,
            },
        );
        self.persist(&entries)?;
        Ok(names)
    }

    pub async fn read(&self, address: &str) -> Vec<String> {
        self.read_at(address, Utc::now()).await
    }

    pub async fn write(&self, address: &str, names: Vec<String>) -> Result<Vec<String>, ProjectCacheError> {
        self.write_at(address, names, Utc::now()).await
    }

    pub async fn remember(&self, address: &str, name: &str) -> Result<Vec<String>, ProjectCacheError> {
        self.remember_at(address, name, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const WALLET_A: &str = "0xAbC0000000000000000000000000000000000001";
    const WALLET_B: &str = "0xabc0000000000000000000000000000000000002";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn other_address_reads_empty() {
        let cache = ProjectNameCache::in_memory();
        cache
            .write_at(WALLET_A, vec!["Restauro Duomo".into()], t0())
            .await
            .unwrap();

        assert!(cache.read_at(WALLET_B, t0()).await.is_empty());
        assert_eq!(cache.read_at(WALLET_A, t0()).await, ["Restauro Duomo"]);
    }

    #[tokio::test]
    async fn keys_ignore_address_case() {
        let cache = ProjectNameCache::in_memory();
        cache.write_at(WALLET_A, vec!["P".into()], t0()).await.unwrap();

        assert_eq!(cache.read_at(&WALLET_A.to_lowercase(), t0()).await, ["P"]);
    }

    #[tokio::test]
    async fn entries_expire_after_24_hours() {
        let cache = ProjectNameCache::in_memory();
        cache.write_at(WALLET_A, vec!["P".into()], t0()).await.unwrap();

        let almost = t0() + TimeDelta::hours(24) - TimeDelta::seconds(1);
        assert_eq!(cache.read_at(WALLET_A, almost).await, ["P"]);

        let expired = t0() + TimeDelta::hours(24);
        assert!(cache.read_at(WALLET_A, expired).await.is_empty());
        // Dropped, not just hidden.
        assert!(cache.read_at(WALLET_A, t0()).await.is_empty());
    }

    #[tokio::test]
    async fn remember_appends_without_duplicates() {
        let cache = ProjectNameCache::in_memory();
        cache.remember_at(WALLET_A, "Duomo", t0()).await.unwrap();
        cache.remember_at(WALLET_A, " duomo ", t0()).await.unwrap();
        let names = cache.remember_at(WALLET_A, "Portale", t0()).await.unwrap();

        assert_eq!(names, ["Duomo", "Portale"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_remembers_keep_every_name() {
        let cache = std::sync::Arc::new(ProjectNameCache::in_memory());
        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.remember(WALLET_A, &format!("P{i}")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(cache.read(WALLET_A).await.len(), 64);
    }

    #[tokio::test]
    async fn file_backed_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        {
            let cache = ProjectNameCache::open(dir.path()).unwrap();
            assert!(cache.is_persistent());
            cache.write_at(WALLET_A, vec!["Duomo".into()], now).await.unwrap();
        }

        let reopened = ProjectNameCache::open(dir.path()).unwrap();
        assert_eq!(reopened.read_at(WALLET_A, now).await, ["Duomo"]);
        assert!(dir.path().join(PROJECT_CACHE_FILE).exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_CACHE_FILE), b"{not json").unwrap();
        assert!(matches!(
            ProjectNameCache::open(dir.path()),
            Err(ProjectCacheError::Corrupt(_))
        ));
    }
}
