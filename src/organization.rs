// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Organization profiles.
//!
//! There is no on-chain organization type. A profile is a certificate whose
//! metadata `name` starts with [`ORG_PREFIX`], found by scanning the
//! certificates an address owns.

use serde::Serialize;
use utoipa::ToSchema;

use crate::certificates::Certificate;
use crate::metadata::CertificationMetadata;

/// Reserved name prefix marking an organization profile.
pub const ORG_PREFIX: &str = "ORG: ";

/// Display name used when a profile has no usable name.
pub const DEFAULT_ORG_NAME: &str = "Organizzazione";

pub fn is_org_nft_name(name: &str) -> bool {
    name.starts_with(ORG_PREFIX)
}

/// Name shown to users: the prefix stripped and whitespace trimmed.
pub fn org_display_name(name: Option<&str>) -> String {
    let display = name
        .map(|n| n.strip_prefix(ORG_PREFIX).unwrap_or(n).trim())
        .unwrap_or_default();
    if display.is_empty() {
        DEFAULT_ORG_NAME.to_string()
    } else {
        display.to_string()
    }
}

/// Name written into the metadata of a new profile.
pub fn org_nft_name(display_name: &str) -> String {
    format!("{ORG_PREFIX}{}", display_name.trim())
}

/// A discovered organization profile.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Organization {
    pub token_id: u64,
    #[schema(value_type = Option<String>)]
    pub owner: Option<alloy::primitives::Address>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub explorer_url: String,
}

impl Organization {
    /// `Some` when the certificate's metadata marks it as a profile.
    pub fn from_certificate(certificate: &Certificate) -> Option<Self> {
        let metadata = certificate.metadata.as_ref().filter(|m| is_organization(m))?;
        Some(Self {
            token_id: certificate.token_id,
            owner: certificate.owner,
            display_name: org_display_name(Some(&metadata.name)),
            description: Some(metadata.description.clone()).filter(|d| !d.is_empty()),
            image: metadata.image.clone(),
            explorer_url: certificate.explorer_url.clone(),
        })
    }
}

pub fn is_organization(metadata: &CertificationMetadata) -> bool {
    is_org_nft_name(&metadata.name)
}

/// Keep only the profiles among `certificates`, in input order.
pub fn discover(certificates: &[Certificate]) -> Vec<Organization> {
    certificates
        .iter()
        .filter_map(Organization::from_certificate)
        .collect()
}
