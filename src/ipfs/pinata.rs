// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pinning client for a Pinata-compatible API.
//!
//! Endpoints:
//! - `POST /pinning/pinJSONToIPFS` with `{pinataContent, pinataMetadata}`
//! - `POST /pinning/pinFileToIPFS` as `multipart/form-data` (`file` part)
//!
//! Both answer `{IpfsHash, PinSize, Timestamp}`.

use std::future::Future;
use std::time::Duration;

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::IpfsError;

/// Request timeout for pinning calls. Files up to 25 MiB go through here.
const PIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Pinning API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PinResponse {
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pub pin_size: u64,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: String,
}

/// A file to pin, already decoded from the request.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Pinning side of the certification flow.
pub trait MetadataPinner: Send + Sync {
    /// Pin a JSON document under a human-readable pin name.
    fn pin_json(
        &self,
        pin_name: &str,
        document: &Value,
    ) -> impl Future<Output = Result<PinResponse, IpfsError>> + Send;

    /// Pin a file. Resolves to [`IpfsError::Cancelled`] once `cancel` fires.
    fn pin_file(
        &self,
        file: &FileUpload,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<PinResponse, IpfsError>> + Send;
}

/// HTTP client for the pinning API.
#[derive(Clone)]
pub struct PinataClient {
    api_url: String,
    jwt: String,
    client: reqwest::Client,
}

impl PinataClient {
    pub fn new(api_url: impl Into<String>, jwt: impl Into<String>) -> Result<Self, IpfsError> {
        let client = reqwest::Client::builder()
            .timeout(PIN_TIMEOUT)
            .build()?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            jwt: jwt.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn read_pin_response(response: reqwest::Response) -> Result<PinResponse, IpfsError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IpfsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let pin: PinResponse = response
            .json()
            .await
            .map_err(|e| IpfsError::InvalidResponse(e.to_string()))?;

        if pin.ipfs_hash.trim().is_empty() {
            return Err(IpfsError::InvalidResponse("empty IpfsHash".to_string()));
        }
        Ok(pin)
    }
}

impl MetadataPinner for PinataClient {
    async fn pin_json(&self, pin_name: &str, document: &Value) -> Result<PinResponse, IpfsError> {
        let body = json!({
            "pinataContent": document,
            "pinataMetadata": { "name": pin_name },
        });

        let response = self
            .client
            .post(self.endpoint("/pinning/pinJSONToIPFS"))
            .bearer_auth(&self.jwt)
            .json(&body)
            .send()
            .await?;

        let pin = Self::read_pin_response(response).await?;
        tracing::info!(cid = %pin.ipfs_hash, size = pin.pin_size, name = pin_name, "Pinned JSON");
        Ok(pin)
    }

    async fn pin_file(
        &self,
        file: &FileUpload,
        cancel: &CancellationToken,
    ) -> Result<PinResponse, IpfsError> {
        let mut part = multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| IpfsError::Http(format!("invalid content type: {e}")))?;
        }
        let form = multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", json!({ "name": file.name }).to_string());

        let request = self
            .client
            .post(self.endpoint("/pinning/pinFileToIPFS"))
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(file = %file.name, "File upload cancelled");
                return Err(IpfsError::Cancelled);
            }
            response = request => response?,
        };

        let pin = Self::read_pin_response(response).await?;
        tracing::info!(
            cid = %pin.ipfs_hash,
            size = pin.pin_size,
            file = %file.name,
            "Pinned file"
        );
        Ok(pin)
    }
}
