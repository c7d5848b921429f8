// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use alloy::primitives::Address;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::SbtClient,
    certificates::{Certificate, CertificateKind, CertificatePage, CertificateService},
    error::ApiError,
    flow::{FlowStep, StepState},
    metadata::{CertificationMetadata, CertificationProperties, FileMetadata, StorageInfo},
    models::{
        CacheInvalidatedResponse, CreateCertificationRequest, CreateOrganizationRequest,
        FlowResponse, InlineFile, NewVersionRequest, ProjectNamesResponse, PublicConfig,
        RememberProjectRequest,
    },
    organization::Organization,
    state::AppState,
    validation::{FieldError, MAX_FILE_BYTES},
};

/// Request body limit for the write endpoints: a base64 file at the size
/// limit plus room for the rest of the JSON form.
pub const MAX_WRITE_BODY_BYTES: usize = MAX_FILE_BYTES.div_ceil(3) * 4 + 2 * 1024 * 1024;

pub mod cache;
pub mod certificates;
pub mod certifications;
pub mod config;
pub mod health;
pub mod metadata;
pub mod projects;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/config", get(config::get_config))
        .route("/certificates", get(certificates::list_certificates))
        .route("/certificates/{token_id}", get(certificates::get_certificate))
        .route(
            "/owners/{address}/certificates",
            get(certificates::owner_certificates),
        )
        .route(
            "/owners/{address}/organizations",
            get(certificates::owner_organizations),
        )
        .route("/metadata/{cid}", get(metadata::get_metadata))
        .route(
            "/certifications",
            post(certifications::create_certification)
                .layer(DefaultBodyLimit::max(MAX_WRITE_BODY_BYTES)),
        )
        .route(
            "/certifications/{token_id}/versions",
            post(certifications::create_version)
                .layer(DefaultBodyLimit::max(MAX_WRITE_BODY_BYTES)),
        )
        .route(
            "/organizations",
            post(certifications::create_organization)
                .layer(DefaultBodyLimit::max(MAX_WRITE_BODY_BYTES)),
        )
        .route(
            "/projects/{address}",
            get(projects::get_projects).post(projects::remember_project),
        )
        .route("/cache/invalidate", post(cache::invalidate_cache))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Parse a `0x`-prefixed 20-byte address from a path or query value.
pub(crate) fn parse_address(address: &str) -> Result<Address, ApiError> {
    let address = address.trim();
    let Some(hex) = address.strip_prefix("0x") else {
        return Err(ApiError::bad_request("Address must start with 0x"));
    };
    if hex.len() != 40 {
        return Err(ApiError::bad_request(
            "Address must be 42 characters (0x + 40 hex)",
        ));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::bad_request("Address must contain only hex characters"));
    }
    address
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid address"))
}

pub(crate) fn certificate_service(state: &AppState) -> CertificateService<'_, SbtClient> {
    CertificateService::new(
        state.chain.as_ref(),
        state.metadata.clone(),
        &state.config.network,
        state.config.sbt_contract,
    )
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        config::get_config,
        certificates::list_certificates,
        certificates::get_certificate,
        certificates::owner_certificates,
        certificates::owner_organizations,
        metadata::get_metadata,
        certifications::create_certification,
        certifications::create_organization,
        certifications::create_version,
        projects::get_projects,
        projects::remember_project,
        cache::invalidate_cache
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            PublicConfig,
            Certificate,
            CertificateKind,
            CertificatePage,
            CertificationMetadata,
            CertificationProperties,
            FileMetadata,
            StorageInfo,
            Organization,
            InlineFile,
            CreateCertificationRequest,
            CreateOrganizationRequest,
            NewVersionRequest,
            FlowResponse,
            FlowStep,
            StepState,
            FieldError,
            ProjectNamesResponse,
            RememberProjectRequest,
            CacheInvalidatedResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Config", description = "Public client configuration"),
        (name = "Certificates", description = "Certificate listing and lookup"),
        (name = "Metadata", description = "Cached IPFS metadata documents"),
        (name = "Certifications", description = "Minting and versioning"),
        (name = "Projects", description = "Project-name autocomplete"),
        (name = "Cache", description = "Read cache control")
    )
)]
struct ApiDoc;
