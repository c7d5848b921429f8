// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Form validation.
//!
//! Runs before any network call and reports every failing field at once.
//! Successful validation yields the drafts the certification flow consumes.

use alloy::primitives::Address;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::flow::{CertificationDraft, VersionDraft};
use crate::ipfs::FileUpload;
use crate::models::{
    CreateCertificationRequest, CreateOrganizationRequest, InlineFile, NewVersionRequest,
};
use crate::organization::{is_org_nft_name, org_nft_name, ORG_PREFIX};

pub const MAX_NAME_CHARS: usize = 120;
pub const MAX_ORG_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;
pub const MAX_FORM_ENTRIES: usize = 50;
pub const MAX_FORM_KEY_CHARS: usize = 64;
pub const MAX_FORM_VALUE_CHARS: usize = 2000;
pub const MAX_FILE_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Validation failed for {} field(s)", fields.len())]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn text(&mut self, field: &str, value: &str, max: usize) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, "is required");
        } else if value.chars().count() > max {
            self.push(field, format!("must be at most {max} characters"));
        }
        value.to_string()
    }

    /// Like [`Self::text`], but the reserved organization prefix is refused.
    /// Profiles only get it through [`organization`].
    fn name(&mut self, field: &str, value: &str, max: usize) -> String {
        let value = self.text(field, value, max);
        if is_org_nft_name(&value) {
            self.push(field, format!("must not start with the reserved \"{ORG_PREFIX}\" prefix"));
        }
        value
    }

    fn address(&mut self, field: &str, value: &str) -> Option<Address> {
        let value = value.trim();
        if value.is_empty() {
            self.push(field, "is required");
            return None;
        }
        let hex = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"));
        match hex {
            Some(hex) if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) => {
                value.parse().ok().or_else(|| {
                    self.push(field, "is not a valid address");
                    None
                })
            }
            _ => {
                self.push(field, "must be a 0x-prefixed 20-byte hex address");
                None
            }
        }
    }

    fn form_data(&mut self, form_data: &Map<String, Value>) {
        if form_data.len() > MAX_FORM_ENTRIES {
            self.push(
                "form_data",
                format!("must have at most {MAX_FORM_ENTRIES} entries"),
            );
        }
        for (key, value) in form_data {
            if key.trim().is_empty() || key.chars().count() > MAX_FORM_KEY_CHARS {
                self.push(
                    format!("form_data.{key}"),
                    format!("key must be 1 to {MAX_FORM_KEY_CHARS} characters"),
                );
            }
            if let Value::String(s) = value {
                if s.chars().count() > MAX_FORM_VALUE_CHARS {
                    self.push(
                        format!("form_data.{key}"),
                        format!("must be at most {MAX_FORM_VALUE_CHARS} characters"),
                    );
                }
            }
        }
    }

    fn file(&mut self, file: Option<&InlineFile>) -> Option<FileUpload> {
        let file = file?;
        let name = file.name.trim();
        if name.is_empty() {
            self.push("file.name", "is required");
        }

        // Cheap upper bound before decoding.
        if file.data_base64.len() / 4 * 3 > MAX_FILE_BYTES + 3 {
            self.push("file", format!("must be at most {} MiB", MAX_FILE_BYTES >> 20));
            return None;
        }
        let bytes = match STANDARD.decode(file.data_base64.trim()) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.push("file.data_base64", "is not valid base64");
                return None;
            }
        };
        if bytes.len() > MAX_FILE_BYTES {
            self.push("file", format!("must be at most {} MiB", MAX_FILE_BYTES >> 20));
            return None;
        }

        Some(FileUpload {
            name: name.to_string(),
            content_type: file
                .content_type
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            bytes,
        })
    }

    fn finish<T>(self, value: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        if !self.errors.is_empty() {
            return Err(ValidationErrors {
                fields: self.errors,
            });
        }
        value().ok_or_else(|| ValidationErrors {
            fields: vec![FieldError {
                field: "request".to_string(),
                message: "is incomplete".to_string(),
            }],
        })
    }
}

pub fn certification(
    request: &CreateCertificationRequest,
) -> Result<CertificationDraft, ValidationErrors> {
    let mut v = Validator::default();
    let name = v.name("name", &request.name, MAX_NAME_CHARS);
    let description = v.text("description", &request.description, MAX_DESCRIPTION_CHARS);
    let recipient = v.address("recipient", &request.recipient);
    v.form_data(&request.form_data);
    let file = v.file(request.file.as_ref());

    v.finish(|| {
        Some(CertificationDraft {
            name,
            description,
            recipient: recipient?,
            form_data: request.form_data.clone(),
            file,
        })
    })
}

/// Organization profile: `name` is the display part and gets the reserved
/// prefix in the resulting draft.
pub fn organization(
    request: &CreateOrganizationRequest,
) -> Result<CertificationDraft, ValidationErrors> {
    let mut v = Validator::default();
    let display = v.name("name", &request.name, MAX_ORG_NAME_CHARS);
    let description = v.text("description", &request.description, MAX_DESCRIPTION_CHARS);
    let recipient = v.address("recipient", &request.recipient);
    v.form_data(&request.form_data);
    let file = v.file(request.file.as_ref());

    v.finish(|| {
        Some(CertificationDraft {
            name: org_nft_name(&display),
            description,
            recipient: recipient?,
            form_data: request.form_data.clone(),
            file,
        })
    })
}

/// A new version of `token_id`. The name is given without the organization
/// prefix; the flow keeps a profile a profile.
pub fn version(token_id: u64, request: &NewVersionRequest) -> Result<VersionDraft, ValidationErrors> {
    let mut v = Validator::default();
    let name = v.name("name", &request.name, MAX_NAME_CHARS);
    let description = v.text("description", &request.description, MAX_DESCRIPTION_CHARS);
    v.form_data(&request.form_data);
    let file = v.file(request.file.as_ref());

    v.finish(|| {
        Some(VersionDraft {
            token_id,
            name,
            description,
            form_data: request.form_data.clone(),
            file,
        })
    })
}
