// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Data directory availability (if configured).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// JWKS status. Only present when `PRIVY_APP_ID` is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
    /// Chain RPC reachability.
    pub rpc: String,
    /// "enabled" or "disabled"; informational, never degrades status.
    pub writes: String,
}

/// Simple health check response for liveness checks.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn check_data_dir(state: &AppState) -> Option<String> {
    let dir = state.config.data_dir.as_ref()?;
    Some(if dir.is_dir() { "ok" } else { "missing" }.to_string())
}

async fn check_jwks(state: &AppState) -> Option<String> {
    let keys = state.auth_config.jwks.as_ref()?;
    if keys.is_fresh().await {
        return Some("ok".to_string());
    }
    match keys.ensure_fresh().await {
        Ok(()) => Some("ok".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "JWKS unavailable");
            Some("unavailable".to_string())
        }
    }
}

async fn check_rpc(state: &AppState) -> String {
    match state.chain.get_block_number().await {
        Ok(_) => "ok".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Chain RPC unavailable");
            "unavailable".to_string()
        }
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let data_dir = check_data_dir(&state);
    let jwks = check_jwks(&state).await;
    let rpc = check_rpc(&state).await;

    let data_ok = data_dir.as_deref().is_none_or(|s| s == "ok");
    let jwks_ok = jwks.as_deref().is_none_or(|s| s == "ok");
    let all_ok = data_ok && jwks_ok && rpc == "ok";

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            data_dir,
            jwks,
            rpc,
            writes: if state.write_clients().is_some() {
                "enabled"
            } else {
                "disabled"
            }
            .to_string(),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness handler.
///
/// Returns 200 only if the RPC endpoint (and JWKS, when configured) answer.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn unreachable_rpc_degrades_health() {
        let (status, Json(body)) = health(State(AppState::for_tests())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.rpc, "unavailable");
        assert_eq!(body.checks.writes, "disabled");
        assert!(body.checks.jwks.is_none());
        assert!(body.checks.data_dir.is_none());
    }
}
