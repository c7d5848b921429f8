// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! IPFS integration.
//!
//! - [`pinata`]: pinning client for a Pinata-compatible API (JSON and files)
//! - [`gateway`]: gateway reads and the process-wide metadata cache
//! - [`cid`]: CID normalization and gateway URL helpers

pub mod cid;
pub mod gateway;
pub mod pinata;

pub use cid::{gateway_url, ipfs_uri, normalize_cid};
pub use gateway::{GatewayClient, MetadataCache, MetadataFetcher};
pub use pinata::{FileUpload, MetadataPinner, PinResponse, PinataClient};

/// Errors from the pinning API or the gateway.
#[derive(Debug, thiserror::Error)]
pub enum IpfsError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IPFS service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response from IPFS service: {0}")]
    InvalidResponse(String),

    #[error("Not a valid IPFS reference: {0}")]
    InvalidCid(String),

    #[error("Upload cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for IpfsError {
    fn from(e: reqwest::Error) -> Self {
        IpfsError::Http(e.to_string())
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;

    /// Serve `app` on an ephemeral local port and return its base URL.
    pub async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}
