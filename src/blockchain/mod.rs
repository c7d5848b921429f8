// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain integration for the certification SBT contract on Base.
//!
//! This module provides:
//! - Cached view calls (`ownerOf`, `tokenURI`, `balanceOf`, `totalSupply`)
//! - Multicall3 batching of owner / URI reads
//! - Signed `mint` and `setTokenURI` transactions

pub mod client;
pub mod multicall;
pub mod read_cache;
pub mod sbt;
pub mod signing;
pub mod transactions;
pub mod types;

pub use client::{ChainError, SbtClient, SbtReader};
pub use multicall::{fetch_owners_and_uris, MulticallTransport, MULTICALL_BATCH_SIZE};
pub use read_cache::{ReadCache, READ_CACHE_TTL};
pub use transactions::{CertificateWriter, SbtWriter};
pub use types::*;
