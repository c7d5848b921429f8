// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate listing, lookup and filtering.
//!
//! The SBT contract is not enumerable, so every listing walks token ids
//! `1..=totalSupply` through batched reads and filters afterwards. Metadata
//! is resolved through the shared [`MetadataCache`] only when the caller
//! asks for it or a filter needs it.

use std::sync::Arc;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use utoipa::ToSchema;

use crate::blockchain::{ChainError, NetworkConfig, SbtReader, TokenRead};
use crate::ipfs::{normalize_cid, GatewayClient, MetadataCache, MetadataFetcher};
use crate::metadata::CertificationMetadata;
use crate::organization::{is_organization, Organization};

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 200;

/// Gateway requests in flight per listing.
const METADATA_CONCURRENCY: usize = 8;

/// A minted certificate as served by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Certificate {
    pub token_id: u64,
    /// `None` when the `ownerOf` read failed inside its batch.
    #[schema(value_type = Option<String>)]
    pub owner: Option<Address>,
    pub token_uri: Option<String>,
    pub cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CertificationMetadata>,
    pub explorer_url: String,
}

impl Certificate {
    pub fn from_read(read: TokenRead, network: &NetworkConfig, contract: &Address) -> Self {
        Self {
            token_id: read.token_id,
            owner: read.owner,
            cid: read.token_uri.as_deref().and_then(normalize_cid),
            token_uri: read.token_uri,
            metadata: None,
            explorer_url: network.token_url(contract, read.token_id),
        }
    }

    pub fn is_organization(&self) -> bool {
        self.metadata.as_ref().is_some_and(is_organization)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CertificateKind {
    #[default]
    All,
    Certification,
    Organization,
}

#[derive(Debug, Clone, Default)]
pub struct CertificateFilter {
    pub owner: Option<Address>,
    pub kind: CertificateKind,
    /// Case-insensitive substring of the metadata name.
    pub search: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl CertificateFilter {
    /// Effective page size: default 50, at most 200, at least 1.
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether matching needs metadata loaded.
    pub fn needs_metadata(&self) -> bool {
        self.kind != CertificateKind::All || self.search_term().is_some()
    }

    pub fn matches(&self, certificate: &Certificate) -> bool {
        if let Some(owner) = self.owner {
            if certificate.owner != Some(owner) {
                return false;
            }
        }

        match self.kind {
            CertificateKind::All => {}
            CertificateKind::Organization if !certificate.is_organization() => return false,
            CertificateKind::Certification if certificate.is_organization() => return false,
            _ => {}
        }

        if let Some(term) = self.search_term() {
            let name_matches = certificate
                .metadata
                .as_ref()
                .is_some_and(|m| m.name.to_lowercase().contains(&term));
            if !name_matches {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CertificatePage {
    /// Matching certificates before pagination.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub items: Vec<Certificate>,
}

/// Filter then paginate.
pub fn apply_filter(certificates: Vec<Certificate>, filter: &CertificateFilter) -> CertificatePage {
    let matching: Vec<Certificate> = certificates
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();

    let limit = filter.limit();
    let total = matching.len();
    let items = matching
        .into_iter()
        .skip(filter.offset)
        .take(limit)
        .collect();

    CertificatePage {
        total,
        offset: filter.offset,
        limit,
        items,
    }
}

/// Read-side service over the contract and the metadata cache.
pub struct CertificateService<'a, R, F = GatewayClient> {
    reader: &'a R,
    metadata: Arc<MetadataCache<F>>,
    network: &'a NetworkConfig,
    contract: Address,
}

impl<'a, R, F> CertificateService<'a, R, F>
where
    R: SbtReader,
    F: MetadataFetcher + 'static,
{
    pub fn new(
        reader: &'a R,
        metadata: Arc<MetadataCache<F>>,
        network: &'a NetworkConfig,
        contract: Address,
    ) -> Self {
        Self {
            reader,
            metadata,
            network,
            contract,
        }
    }

    /// Every minted certificate, without metadata.
    async fn all(&self) -> Result<Vec<Certificate>, ChainError> {
        let supply = self.reader.total_supply().await?;
        let ids: Vec<u64> = (1..=supply).collect();
        let reads = self.reader.owners_and_uris(&ids).await;
        tracing::debug!(supply, "Loaded certificate owners and URIs");

        Ok(reads
            .into_iter()
            .map(|read| Certificate::from_read(read, self.network, &self.contract))
            .collect())
    }

    pub async fn list(
        &self,
        filter: &CertificateFilter,
        resolve: bool,
    ) -> Result<CertificatePage, ChainError> {
        let mut certificates = self.all().await?;

        // Owner is known without metadata; narrow before hitting the gateway.
        if let Some(owner) = filter.owner {
            certificates.retain(|c| c.owner == Some(owner));
        }
        if resolve || filter.needs_metadata() {
            self.hydrate(&mut certificates).await;
        }

        Ok(apply_filter(certificates, filter))
    }

    /// A single certificate, `None` when the id was never minted.
    pub async fn get(&self, token_id: u64) -> Result<Option<Certificate>, ChainError> {
        let supply = self.reader.total_supply().await?;
        if token_id == 0 || token_id > supply {
            return Ok(None);
        }

        let owner = self.reader.owner_of(token_id).await?;
        let token_uri = self.reader.token_uri(token_id).await?;
        let read = TokenRead {
            token_id,
            owner: Some(owner),
            token_uri: Some(token_uri),
        };

        let mut certificate = [Certificate::from_read(read, self.network, &self.contract)];
        self.hydrate(&mut certificate).await;
        let [certificate] = certificate;
        Ok(Some(certificate))
    }

    pub async fn owned_by(&self, owner: Address, resolve: bool) -> Result<Vec<Certificate>, ChainError> {
        if self.reader.balance_of(owner).await? == 0 {
            return Ok(Vec::new());
        }
        let mut certificates = self.all().await?;
        certificates.retain(|c| c.owner == Some(owner));
        if resolve {
            self.hydrate(&mut certificates).await;
        }
        Ok(certificates)
    }

    pub async fn organizations_of(&self, owner: Address) -> Result<Vec<Organization>, ChainError> {
        let owned = self.owned_by(owner, true).await?;
        Ok(crate::organization::discover(&owned))
    }

    /// Fill in `metadata` for every certificate with a CID. Failed fetches
    /// and unparseable documents leave it `None`.
    pub async fn hydrate(&self, certificates: &mut [Certificate]) {
        let limit = Arc::new(Semaphore::new(METADATA_CONCURRENCY));
        let mut tasks = JoinSet::new();

        for (index, certificate) in certificates.iter().enumerate() {
            if certificate.metadata.is_some() {
                continue;
            }
            let Some(cid) = certificate.cid.clone() else {
                continue;
            };
            let cache = Arc::clone(&self.metadata);
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                let _permit = limit.acquire_owned().await.ok();
                (index, cache.get(&cid).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(document))) => {
                    let token_id = certificates[index].token_id;
                    match serde_json::from_value::<CertificationMetadata>((*document).clone()) {
                        Ok(metadata) => certificates[index].metadata = Some(metadata),
                        Err(e) => {
                            tracing::warn!(token_id, error = %e, "Metadata does not match the certification schema")
                        }
                    }
                }
                Ok((index, Err(e))) => {
                    tracing::warn!(
                        token_id = certificates[index].token_id,
                        error = %e,
                        "Could not load certificate metadata"
                    );
                }
                Err(e) => tracing::error!(error = %e, "Metadata task failed"),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ipfs::IpfsError;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn owner(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    /// In-memory contract: token `i` (1-based) is `tokens[i - 1]`.
    #[derive(Default)]
    pub(crate) struct FakeChain {
        pub tokens: Vec<(Address, String)>,
        pub invalidations: AtomicUsize,
    }

    impl SbtReader for FakeChain {
        async fn total_supply(&self) -> Result<u64, ChainError> {
            Ok(self.tokens.len() as u64)
        }

        async fn owner_of(&self, token_id: u64) -> Result<Address, ChainError> {
            self.tokens
                .get(token_id as usize - 1)
                .map(|(owner, _)| *owner)
                .ok_or_else(|| ChainError::Reverted("ERC721NonexistentToken".into()))
        }

        async fn token_uri(&self, token_id: u64) -> Result<String, ChainError> {
            self.tokens
                .get(token_id as usize - 1)
                .map(|(_, uri)| uri.clone())
                .ok_or_else(|| ChainError::Reverted("ERC721NonexistentToken".into()))
        }

        async fn balance_of(&self, owner: Address) -> Result<u64, ChainError> {
            Ok(self.tokens.iter().filter(|(o, _)| *o == owner).count() as u64)
        }

        async fn owners_and_uris(&self, token_ids: &[u64]) -> Vec<TokenRead> {
            token_ids
                .iter()
                .map(|&id| {
                    let token = self.tokens.get(id as usize - 1);
                    TokenRead {
                        token_id: id,
                        owner: token.map(|(o, _)| *o),
                        token_uri: token.map(|(_, u)| u.clone()),
                    }
                })
                .collect()
        }

        fn invalidate_cache(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Serves documents from a map; unknown CIDs are gateway 404s.
    #[derive(Default)]
    pub(crate) struct FakeGateway {
        pub documents: HashMap<String, Value>,
        pub fetches: AtomicUsize,
    }

    impl MetadataFetcher for FakeGateway {
        async fn fetch_json(&self, cid: &str) -> Result<Value, IpfsError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.documents.get(cid).cloned().ok_or(IpfsError::Status {
                status: 404,
                body: String::new(),
            })
        }
    }

    fn doc(name: &str) -> Value {
        json!({ "name": name, "description": "d", "properties": {} })
    }

    /// Five tokens: two certifications and one organization for owner 1,
    /// one certification for owner 2, and one with a missing document.
    fn fixture() -> (FakeChain, Arc<MetadataCache<FakeGateway>>) {
        let chain = FakeChain {
            tokens: vec![
                (owner(1), "ipfs://QmA".into()),
                (owner(1), "ipfs://QmOrg".into()),
                (owner(2), "ipfs://QmB".into()),
                (owner(1), "ipfs://QmC".into()),
                (owner(2), "ipfs://QmGone".into()),
            ],
            ..FakeChain::default()
        };
        let gateway = FakeGateway {
            documents: HashMap::from([
                ("QmA".to_string(), doc("Affresco Navata")),
                ("QmOrg".to_string(), doc("ORG: Museo Foo")),
                ("QmB".to_string(), doc("Restauro Portale")),
                ("QmC".to_string(), doc("Affresco Abside")),
            ]),
            ..FakeGateway::default()
        };
        (chain, Arc::new(MetadataCache::new(gateway)))
    }

    fn network() -> NetworkConfig {
        NetworkConfig::base_sepolia()
    }

    #[tokio::test]
    async fn lists_without_metadata_by_default() {
        let (chain, cache) = fixture();
        let network = network();
        let service = CertificateService::new(&chain, cache.clone(), &network, owner(9));

        let page = service.list(&CertificateFilter::default(), false).await.unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert!(page.items.iter().all(|c| c.metadata.is_none()));
        assert_eq!(page.items[0].cid.as_deref(), Some("QmA"));
        assert_eq!(cache.fetcher().fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn filters_by_owner_kind_and_search() {
        let (chain, cache) = fixture();
        let network = network();
        let service = CertificateService::new(&chain, cache, &network, owner(9));

        let certifications = service
            .list(
                &CertificateFilter {
                    owner: Some(owner(1)),
                    kind: CertificateKind::Certification,
                    ..CertificateFilter::default()
                },
                false,
            )
            .await
            .unwrap();
        let ids: Vec<u64> = certifications.items.iter().map(|c| c.token_id).collect();
        assert_eq!(ids, [1, 4]);

        let searched = service
            .list(
                &CertificateFilter {
                    search: Some("  affresco ".into()),
                    ..CertificateFilter::default()
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(searched.total, 2);

        let orgs = service
            .list(
                &CertificateFilter {
                    kind: CertificateKind::Organization,
                    ..CertificateFilter::default()
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(orgs.items.len(), 1);
        assert_eq!(orgs.items[0].token_id, 2);
    }

    #[tokio::test]
    async fn missing_documents_do_not_fail_the_listing() {
        let (chain, cache) = fixture();
        let network = network();
        let service = CertificateService::new(&chain, cache, &network, owner(9));

        let page = service.list(&CertificateFilter::default(), true).await.unwrap();
        assert_eq!(page.total, 5);
        assert!(page.items[4].metadata.is_none());
        assert!(page.items[..4].iter().all(|c| c.metadata.is_some()));
    }

    #[tokio::test]
    async fn get_returns_none_past_supply() {
        let (chain, cache) = fixture();
        let network = network();
        let service = CertificateService::new(&chain, cache, &network, owner(9));

        assert!(service.get(0).await.unwrap().is_none());
        assert!(service.get(6).await.unwrap().is_none());

        let cert = service.get(2).await.unwrap().unwrap();
        assert!(cert.is_organization());
        assert_eq!(cert.owner, Some(owner(1)));
        assert!(cert.explorer_url.ends_with("/2"));
    }

    #[tokio::test]
    async fn organizations_are_discovered_from_owned_certificates() {
        let (chain, cache) = fixture();
        let network = network();
        let service = CertificateService::new(&chain, cache, &network, owner(9));

        let orgs = service.organizations_of(owner(1)).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].display_name, "Museo Foo");

        assert!(service.organizations_of(owner(2)).await.unwrap().is_empty());
    }

    #[test]
    fn pagination_clamps_limit() {
        let certs: Vec<Certificate> = (1..=300)
            .map(|id| Certificate {
                token_id: id,
                owner: Some(owner(1)),
                token_uri: None,
                cid: None,
                metadata: None,
                explorer_url: String::new(),
            })
            .collect();

        let page = apply_filter(
            certs.clone(),
            &CertificateFilter {
                offset: 250,
                limit: Some(1000),
                ..CertificateFilter::default()
            },
        );
        assert_eq!(page.total, 300);
        assert_eq!(page.limit, MAX_PAGE_LIMIT);
        assert_eq!(page.items.len(), 50);
        assert_eq!(page.items[0].token_id, 251);

        let page = apply_filter(
            certs,
            &CertificateFilter {
                limit: Some(0),
                ..CertificateFilter::default()
            },
        );
        assert_eq!(page.items.len(), 1);
    }
}
