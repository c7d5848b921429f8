// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Project-name autocomplete per wallet.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{certificate_service, parse_address};
use crate::{
    auth::Auth,
    error::ApiError,
    models::{ProjectNamesResponse, RememberProjectRequest},
    state::AppState,
    validation::MAX_FORM_VALUE_CHARS,
};

/// Project names used by an address.
///
/// Served from the 24h cache; on a miss the address' certificates are
/// scanned for `properties.form_data.project_name` and a non-empty result is
/// stored.
#[utoipa::path(
    get,
    path = "/v1/projects/{address}",
    tag = "Projects",
    params(("address" = String, Path, description = "Wallet address")),
    responses(
        (status = 200, description = "Project names", body = ProjectNamesResponse),
        (status = 400, description = "Invalid address"),
        (status = 502, description = "Chain RPC error")
    )
)]
pub async fn get_projects(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ProjectNamesResponse>, ApiError> {
    let owner = parse_address(&address)?;
    let key = owner.to_string();

    let cached = state.projects.read(&key).await;
    if !cached.is_empty() {
        return Ok(Json(ProjectNamesResponse {
            address: key,
            project_names: cached,
            cached: true,
        }));
    }

    let certificates = certificate_service(&state).owned_by(owner, true).await?;
    let scanned: Vec<String> = certificates
        .iter()
        .filter_map(|c| c.metadata.as_ref()?.project_name())
        .map(str::to_string)
        .collect();
    tracing::debug!(address = %key, found = scanned.len(), "Scanned certificates for project names");

    let project_names = if scanned.is_empty() {
        scanned
    } else {
        state.projects.write(&key, scanned).await.map_err(|e| {
            tracing::error!(error = %e, "Could not store project names");
            ApiError::internal("Could not store project names")
        })?
    };

    Ok(Json(ProjectNamesResponse {
        address: key,
        project_names,
        cached: false,
    }))
}

/// Add a project name to an address' list.
#[utoipa::path(
    post,
    path = "/v1/projects/{address}",
    tag = "Projects",
    security(("bearer_auth" = [])),
    params(("address" = String, Path, description = "Wallet address")),
    request_body = RememberProjectRequest,
    responses(
        (status = 200, description = "Updated project names", body = ProjectNamesResponse),
        (status = 400, description = "Invalid address"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Empty or overlong project name")
    )
)]
pub async fn remember_project(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<RememberProjectRequest>,
) -> Result<Json<ProjectNamesResponse>, ApiError> {
    let owner = parse_address(&address)?;
    let name = request.project_name.trim();
    if name.is_empty() || name.chars().count() > MAX_FORM_VALUE_CHARS {
        return Err(ApiError::unprocessable(format!(
            "project_name must be 1 to {MAX_FORM_VALUE_CHARS} characters"
        )));
    }

    let key = owner.to_string();
    let project_names = state.projects.remember(&key, name).await.map_err(|e| {
        tracing::error!(error = %e, "Could not store project names");
        ApiError::internal("Could not store project names")
    })?;

    Ok(Json(ProjectNamesResponse {
        address: key,
        project_names,
        cached: true,
    }))
}
