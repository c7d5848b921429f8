// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ArtCertify - Certification SBT Service
//!
//! Mints soulbound certification tokens on Base and serves them back with
//! their IPFS metadata.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Embedded-wallet JWT authentication
//! - `blockchain` - SBT contract reads, Multicall3 batching and signed writes
//! - `ipfs` - Pinning client, gateway reads and the metadata cache
//! - `flow` - The upload-then-mint certification saga
//! - `certificates` / `organization` - Listing, filtering and org profiles
//! - `projects` - Per-wallet project-name cache

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod certificates;
pub mod config;
pub mod error;
pub mod flow;
pub mod ipfs;
pub mod metadata;
pub mod models;
pub mod organization;
pub mod projects;
pub mod state;
pub mod validation;
