// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Models
//!
//! Request and response types for the REST API. Domain types that are
//! served as-is (certificates, metadata, flow steps) live in their own
//! modules and are re-used here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::flow::{FlowOutcome, FlowStep};
use crate::metadata::CertificationMetadata;

/// File sent inline with a form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InlineFile {
    /// Original file name.
    pub name: String,
    /// MIME type, e.g. `image/jpeg`.
    #[serde(default)]
    pub content_type: Option<String>,
    /// File bytes, standard base64.
    pub data_base64: String,
}

/// Request to certify an artwork and mint the certificate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCertificationRequest {
    pub name: String,
    pub description: String,
    /// Wallet receiving the certificate (0x-prefixed).
    pub recipient: String,
    /// Free-form form fields stored under `properties.form_data`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_data: Map<String, Value>,
    #[serde(default)]
    pub file: Option<InlineFile>,
}

/// Request to create an organization profile.
///
/// `name` is the display name; the `ORG: ` prefix is added by the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub description: String,
    pub recipient: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_data: Map<String, Value>,
    /// Logo or other image.
    #[serde(default)]
    pub file: Option<InlineFile>,
}

/// Request to publish a new version of an existing certificate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewVersionRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_data: Map<String, Value>,
    #[serde(default)]
    pub file: Option<InlineFile>,
}

/// Completed certification or versioning flow.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlowResponse {
    pub run_id: Uuid,
    pub token_id: Option<u64>,
    pub cid: String,
    pub token_uri: String,
    pub tx_hash: String,
    pub explorer_url: String,
    pub block_number: u64,
    pub metadata: CertificationMetadata,
    pub steps: Vec<FlowStep>,
}

impl FlowResponse {
    pub fn new(outcome: FlowOutcome, steps: Vec<FlowStep>) -> Self {
        Self {
            run_id: outcome.run_id,
            token_id: outcome.token_id,
            cid: outcome.cid,
            token_uri: outcome.token_uri,
            tx_hash: outcome.receipt.tx_hash,
            explorer_url: outcome.receipt.explorer_url,
            block_number: outcome.receipt.block_number,
            metadata: outcome.metadata,
            steps,
        }
    }
}

/// Configuration the dashboard needs to talk to the chain and IPFS.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicConfig {
    pub chain_id: u64,
    pub network_name: String,
    pub explorer_url: String,
    pub sbt_contract: String,
    pub ipfs_gateway: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privy_app_id: Option<String>,
    /// Whether minting and versioning are available on this server.
    pub writes_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectNamesResponse {
    pub address: String,
    pub project_names: Vec<String>,
    /// `true` when served from the 24h cache, `false` after a fresh scan.
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RememberProjectRequest {
    pub project_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheInvalidatedResponse {
    /// Read-cache entries dropped.
    pub cleared: usize,
}
