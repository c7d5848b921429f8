// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Write endpoints: certification, organization profile and new version.
//!
//! Each request validates its body, checks that the caller is a configured
//! issuer, then runs the two-step saga (IPFS upload, then the contract call)
//! with the configured minter key.
//! A failed saga answers with the step list so the client can show where
//! it stopped; retrying means sending the same request again.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
    auth::{Auth, AuthenticatedUser},
    blockchain::{SbtClient, SbtReader, SbtWriter},
    error::ApiError,
    flow::{CertificationDraft, CertificationFlow, FlowKind, VersionDraft},
    ipfs::PinataClient,
    metadata::PROJECT_NAME_KEY,
    models::{CreateCertificationRequest, CreateOrganizationRequest, FlowResponse, NewVersionRequest},
    state::AppState,
    validation,
};

/// Every write is signed by the server's minter key, so the contract cannot
/// tell callers apart; only configured issuers may write.
fn authorize_issuer(state: &AppState, user: &AuthenticatedUser) -> Result<(), ApiError> {
    if state.config.is_issuer(&user.user_id) {
        return Ok(());
    }
    tracing::warn!(user_id = %user.user_id, "Write refused: caller is not an issuer");
    Err(ApiError::forbidden("Only configured issuers may mint or version certificates"))
}

fn write_clients(state: &AppState) -> Result<(&SbtWriter, &PinataClient), ApiError> {
    state
        .write_clients()
        .ok_or_else(|| ApiError::service_unavailable("Minting is not configured on this server"))
}

fn build_flow<'a>(
    state: &'a AppState,
    kind: FlowKind,
) -> Result<CertificationFlow<'a, SbtClient, PinataClient, SbtWriter>, ApiError> {
    let (writer, pinner) = write_clients(state)?;
    Ok(CertificationFlow::new(
        kind,
        state.chain.as_ref(),
        pinner,
        writer,
        state.metadata.as_ref(),
        &state.config.ipfs_gateway,
    ))
}

async fn run_mint(state: &AppState, draft: CertificationDraft) -> Result<FlowResponse, ApiError> {
    let mut flow = build_flow(state, FlowKind::Mint)?;
    // Dropping the request future cancels an in-flight file upload.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    match flow.mint(draft, &cancel).await {
        Ok(outcome) => Ok(FlowResponse::new(outcome, flow.steps().to_vec())),
        Err(e) => Err(ApiError::flow_failed(&e, flow.run_id(), flow.steps().to_vec())),
    }
}

/// Add the certificate's project name to the recipient's autocomplete list.
async fn remember_project(state: &AppState, draft: &CertificationDraft) {
    let Some(project) = draft.form_data.get(PROJECT_NAME_KEY).and_then(Value::as_str) else {
        return;
    };
    let address = draft.recipient.to_string();
    if let Err(e) = state.projects.remember(&address, project).await {
        tracing::warn!(error = %e, "Could not update project-name cache");
    }
}

/// Certify an artwork: pin its metadata and mint the certificate.
#[utoipa::path(
    post,
    path = "/v1/certifications",
    tag = "Certifications",
    security(("bearer_auth" = [])),
    request_body = CreateCertificationRequest,
    responses(
        (status = 201, description = "Certificate minted", body = FlowResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an issuer"),
        (status = 422, description = "Validation failed"),
        (status = 502, description = "Upload or transaction failed; body lists the steps"),
        (status = 503, description = "Writes not configured")
    )
)]
pub async fn create_certification(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateCertificationRequest>,
) -> Result<(StatusCode, Json<FlowResponse>), ApiError> {
    let draft = validation::certification(&request)?;
    authorize_issuer(&state, &user)?;
    tracing::info!(user_id = %user.user_id, recipient = %draft.recipient, "Certification requested");

    let response = run_mint(&state, draft.clone()).await?;
    remember_project(&state, &draft).await;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Create an organization profile token.
#[utoipa::path(
    post,
    path = "/v1/organizations",
    tag = "Certifications",
    security(("bearer_auth" = [])),
    request_body = CreateOrganizationRequest,
    responses(
        (status = 201, description = "Organization profile minted", body = FlowResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an issuer"),
        (status = 422, description = "Validation failed"),
        (status = 502, description = "Upload or transaction failed; body lists the steps"),
        (status = 503, description = "Writes not configured")
    )
)]
pub async fn create_organization(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<FlowResponse>), ApiError> {
    let draft = validation::organization(&request)?;
    authorize_issuer(&state, &user)?;
    tracing::info!(user_id = %user.user_id, name = %draft.name, "Organization profile requested");

    let response = run_mint(&state, draft).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Publish a new metadata version of an existing certificate.
///
/// Files and image of the previous version are carried over. A profile
/// stays a profile: its name keeps the organization prefix.
#[utoipa::path(
    post,
    path = "/v1/certifications/{token_id}/versions",
    tag = "Certifications",
    security(("bearer_auth" = [])),
    params(("token_id" = u64, Path, description = "Token id")),
    request_body = NewVersionRequest,
    responses(
        (status = 200, description = "Token URI updated", body = FlowResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not an issuer"),
        (status = 404, description = "Token never minted"),
        (status = 422, description = "Validation failed"),
        (status = 502, description = "Upload or transaction failed; body lists the steps"),
        (status = 503, description = "Writes not configured")
    )
)]
pub async fn create_version(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(token_id): Path<u64>,
    Json(request): Json<NewVersionRequest>,
) -> Result<Json<FlowResponse>, ApiError> {
    let draft: VersionDraft = validation::version(token_id, &request)?;
    authorize_issuer(&state, &user)?;
    let mut flow = build_flow(&state, FlowKind::Version)?;

    let supply = state.chain.total_supply().await?;
    if token_id == 0 || token_id > supply {
        return Err(ApiError::not_found(format!("Certificate {token_id} not found")));
    }
    tracing::info!(user_id = %user.user_id, token_id, "New version requested");

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    match flow.version(draft, &cancel).await {
        Ok(outcome) => Ok(Json(FlowResponse::new(outcome, flow.steps().to_vec()))),
        Err(e) => Err(ApiError::flow_failed(&e, flow.run_id(), flow.steps().to_vec())),
    }
}
