// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certification metadata document.
//!
//! This is the JSON pinned to IPFS and referenced by `tokenURI`:
//!
//! ```json
//! {
//!   "name": "...",
//!   "description": "...",
//!   "image": "ipfs://<cid>",
//!   "properties": {
//!     "form_data": { ... },
//!     "files_metadata": [ { "name", "cid", "size", "mime_type", "gateway_url" } ],
//!     "storage_info": { "provider", "gateway", "uploaded_at", "version", "previous_version_cid" }
//!   }
//! }
//! ```
//!
//! A pinned document never changes. A new version is a new document whose
//! `storage_info.previous_version_cid` points at the one it replaces.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::ipfs::{gateway_url, ipfs_uri, normalize_cid, FileUpload, PinResponse};

pub const STORAGE_PROVIDER: &str = "pinata";

/// `form_data` key holding the project a certification belongs to.
pub const PROJECT_NAME_KEY: &str = "project_name";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CertificationMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub properties: CertificationProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CertificationProperties {
    /// Free-form fields entered in the certification form.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_data: Map<String, Value>,
    #[serde(default)]
    pub files_metadata: Vec<FileMetadata>,
    #[serde(default)]
    pub storage_info: StorageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileMetadata {
    pub name: String,
    pub cid: String,
    pub size: u64,
    pub mime_type: String,
    pub gateway_url: String,
}

impl FileMetadata {
    /// Describe a file that was just pinned.
    pub fn from_pin(file: &FileUpload, pin: &PinResponse, gateway: &str) -> Self {
        Self {
            name: file.name.clone(),
            cid: pin.ipfs_hash.clone(),
            size: file.bytes.len() as u64,
            mime_type: file
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            gateway_url: gateway_url(gateway, &pin.ipfs_hash),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StorageInfo {
    pub provider: String,
    #[serde(default)]
    pub gateway: String,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub uploaded_at: String,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version_cid: Option<String>,
}

fn first_version() -> u32 {
    1
}

impl Default for StorageInfo {
    fn default() -> Self {
        Self {
            provider: STORAGE_PROVIDER.to_string(),
            gateway: String::new(),
            uploaded_at: String::new(),
            version: first_version(),
            previous_version_cid: None,
        }
    }
}

impl CertificationMetadata {
    pub fn version(&self) -> u32 {
        self.properties.storage_info.version
    }

    /// `form_data.project_name`, when present and non-blank.
    pub fn project_name(&self) -> Option<&str> {
        self.properties
            .form_data
            .get(PROJECT_NAME_KEY)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Name used for the pin on the pinning service.
    pub fn pin_name(&self) -> String {
        format!("{} (v{})", self.name, self.version())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Builds a new metadata document, either an original or the next version
/// of an existing one.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    name: String,
    description: String,
    image: Option<String>,
    inherited_image: Option<String>,
    form_data: Map<String, Value>,
    files: Vec<FileMetadata>,
    gateway: String,
    version: u32,
    previous_version_cid: Option<String>,
}

impl MetadataBuilder {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        gateway: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            image: None,
            inherited_image: None,
            form_data: Map::new(),
            files: Vec::new(),
            gateway: gateway.into(),
            version: first_version(),
            previous_version_cid: None,
        }
    }

    pub fn form_data(mut self, form_data: Map<String, Value>) -> Self {
        self.form_data = form_data;
        self
    }

    /// Attach a pinned file. The first image file becomes `image`.
    pub fn file(mut self, file: FileMetadata) -> Self {
        if self.image.is_none() && file.is_image() {
            self.image = Some(ipfs_uri(&file.cid));
        }
        self.files.push(file);
        self
    }

    /// Chain onto `previous`, pinned at `previous_reference`.
    ///
    /// The version number is bumped and the previous files are carried over
    /// ahead of any file attached to this version. Previous `image` is kept
    /// when this version brings none.
    pub fn next_version_of(
        mut self,
        previous: &CertificationMetadata,
        previous_reference: &str,
    ) -> Self {
        self.version = previous.version().saturating_add(1);
        self.previous_version_cid =
            Some(normalize_cid(previous_reference).unwrap_or_else(|| previous_reference.to_string()));

        let mut files = previous.properties.files_metadata.clone();
        files.append(&mut self.files);
        self.files = files;

        self.inherited_image = previous.image.clone();
        self
    }

    pub fn build(self, uploaded_at: DateTime<Utc>) -> CertificationMetadata {
        CertificationMetadata {
            name: self.name,
            description: self.description,
            image: self.image.or(self.inherited_image),
            properties: CertificationProperties {
                form_data: self.form_data,
                files_metadata: self.files,
                storage_info: StorageInfo {
                    provider: STORAGE_PROVIDER.to_string(),
                    gateway: self.gateway,
                    uploaded_at: uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                    version: self.version,
                    previous_version_cid: self.previous_version_cid,
                },
            },
        }
    }
}
