// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate read endpoints.
//!
//! Public: everything here is derived from on-chain data and public IPFS
//! documents.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{certificate_service, parse_address};
use crate::{
    certificates::{Certificate, CertificateFilter, CertificateKind, CertificatePage},
    error::ApiError,
    organization::Organization,
    state::AppState,
};

/// Query parameters for certificate listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CertificateQuery {
    /// Only certificates held by this address.
    pub owner: Option<String>,
    /// `all`, `certification` or `organization`.
    #[param(default = "all")]
    pub kind: Option<CertificateKind>,
    /// Case-insensitive substring of the certificate name.
    pub search: Option<String>,
    #[param(default = 0)]
    pub offset: Option<usize>,
    /// Page size, at most 200.
    #[param(default = 50)]
    pub limit: Option<usize>,
    /// Load IPFS metadata for every returned certificate.
    #[param(default = false)]
    pub resolve: Option<bool>,
}

impl CertificateQuery {
    fn filter(&self) -> Result<CertificateFilter, ApiError> {
        Ok(CertificateFilter {
            owner: self.owner.as_deref().map(parse_address).transpose()?,
            kind: self.kind.unwrap_or_default(),
            search: self.search.clone(),
            offset: self.offset.unwrap_or(0),
            limit: self.limit,
        })
    }
}

/// Query parameters for per-owner listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ResolveQuery {
    #[param(default = true)]
    pub resolve: Option<bool>,
}

/// List minted certificates, filtered and paginated.
#[utoipa::path(
    get,
    path = "/v1/certificates",
    tag = "Certificates",
    params(CertificateQuery),
    responses(
        (status = 200, description = "Certificate page", body = CertificatePage),
        (status = 400, description = "Invalid owner address"),
        (status = 502, description = "Chain RPC error"),
        (status = 503, description = "Chain RPC rate limited")
    )
)]
pub async fn list_certificates(
    State(state): State<AppState>,
    Query(query): Query<CertificateQuery>,
) -> Result<Json<CertificatePage>, ApiError> {
    let filter = query.filter()?;
    let page = certificate_service(&state)
        .list(&filter, query.resolve.unwrap_or(false))
        .await?;
    Ok(Json(page))
}

/// A single certificate with its metadata.
#[utoipa::path(
    get,
    path = "/v1/certificates/{token_id}",
    tag = "Certificates",
    params(("token_id" = u64, Path, description = "Token id")),
    responses(
        (status = 200, description = "Certificate", body = Certificate),
        (status = 404, description = "Token never minted"),
        (status = 502, description = "Chain RPC error")
    )
)]
pub async fn get_certificate(
    State(state): State<AppState>,
    Path(token_id): Path<u64>,
) -> Result<Json<Certificate>, ApiError> {
    certificate_service(&state)
        .get(token_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Certificate {token_id} not found")))
}

/// Certificates held by an address.
#[utoipa::path(
    get,
    path = "/v1/owners/{address}/certificates",
    tag = "Certificates",
    params(
        ("address" = String, Path, description = "Wallet address"),
        ResolveQuery
    ),
    responses(
        (status = 200, description = "Owned certificates", body = [Certificate]),
        (status = 400, description = "Invalid address"),
        (status = 502, description = "Chain RPC error")
    )
)]
pub async fn owner_certificates(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Vec<Certificate>>, ApiError> {
    let owner = parse_address(&address)?;
    let certificates = certificate_service(&state)
        .owned_by(owner, query.resolve.unwrap_or(true))
        .await?;
    Ok(Json(certificates))
}

/// Organization profiles held by an address.
#[utoipa::path(
    get,
    path = "/v1/owners/{address}/organizations",
    tag = "Certificates",
    params(("address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Organization profiles", body = [Organization]),
        (status = 400, description = "Invalid address"),
        (status = 502, description = "Chain RPC error")
    )
)]
pub async fn owner_organizations(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Vec<Organization>>, ApiError> {
    let owner = parse_address(&address)?;
    let organizations = certificate_service(&state).organizations_of(owner).await?;
    Ok(Json(organizations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builds_filter() {
        let query = CertificateQuery {
            owner: Some("0x00000000000000000000000000000000000000aa".into()),
            kind: Some(CertificateKind::Organization),
            search: Some("museo".into()),
            offset: Some(10),
            limit: Some(500),
            resolve: None,
        };
        let filter = query.filter().unwrap();
        assert!(filter.owner.is_some());
        assert_eq!(filter.kind, CertificateKind::Organization);
        assert_eq!(filter.offset, 10);
        assert_eq!(filter.limit(), 200);
    }

    #[test]
    fn bad_owner_is_rejected() {
        let query = CertificateQuery {
            owner: Some("0x123".into()),
            ..Default::default()
        };
        let error = query.filter().unwrap_err();
        assert_eq!(error.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
