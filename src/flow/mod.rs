// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certification and versioning saga.
//!
//! 1. Pin the metadata document (and an optional file) to IPFS.
//! 2. Submit `mint(to, "ipfs://<cid>")` or `setTokenURI(id, "ipfs://<cid>")`
//!    and wait for the receipt.
//!
//! Step 2 never starts before step 1 resolved. A failure stops the saga and
//! is recorded on the step where it happened; there is no automatic retry
//! and no partial resume.

pub mod certification;
pub mod steps;

use alloy::primitives::Address;
use serde_json::{Map, Value};

use crate::blockchain::ChainError;
use crate::ipfs::{FileUpload, IpfsError};

pub use certification::{CertificationFlow, FlowOutcome};
pub use steps::{FlowKind, FlowStep, FlowSteps, StepState};

/// Validated input for a new certification or organization profile.
#[derive(Debug, Clone)]
pub struct CertificationDraft {
    pub name: String,
    pub description: String,
    pub recipient: Address,
    pub form_data: Map<String, Value>,
    pub file: Option<FileUpload>,
}

/// Validated input for a new version of an existing certificate.
#[derive(Debug, Clone)]
pub struct VersionDraft {
    pub token_id: u64,
    pub name: String,
    pub description: String,
    pub form_data: Map<String, Value>,
    pub file: Option<FileUpload>,
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("IPFS upload failed: {0}")]
    Ipfs(#[from] IpfsError),

    #[error("Transaction failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Could not read the current version: {0}")]
    PreviousDocument(#[source] IpfsError),

    #[error("Token {token_id} has unusable metadata: {reason}")]
    PreviousMetadata { token_id: u64, reason: String },
}
