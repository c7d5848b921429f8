// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::{error::ApiError, ipfs::normalize_cid, state::AppState};

/// Metadata document behind a CID, through the shared cache.
///
/// Accepts a bare CID or any `ipfs://` / gateway form of it (URL-encoded).
#[utoipa::path(
    get,
    path = "/v1/metadata/{cid}",
    tag = "Metadata",
    params(("cid" = String, Path, description = "CID or IPFS reference")),
    responses(
        (status = 200, description = "Metadata JSON document", body = serde_json::Value),
        (status = 400, description = "Not an IPFS reference"),
        (status = 404, description = "Gateway has no such document"),
        (status = 502, description = "Gateway error")
    )
)]
pub async fn get_metadata(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let cid = normalize_cid(&cid)
        .ok_or_else(|| ApiError::bad_request(format!("Not a valid IPFS reference: {cid}")))?;
    let document = state.metadata.get(&cid).await?;
    Ok(Json(Value::clone(&document)))
}
