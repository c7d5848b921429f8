// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::blockchain::ChainError;
use crate::flow::{FlowError, FlowStep};
use crate::ipfs::IpfsError;
use crate::validation::{FieldError, ValidationErrors};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Per-field failures for 422 responses.
    pub fields: Vec<FieldError>,
    /// Step list of a failed certification flow.
    pub flow: Option<(Uuid, Vec<FlowStep>)>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<Vec<FlowStep>>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Vec::new(),
            flow: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// A certification flow stopped on one of its steps.
    pub fn flow_failed(error: &FlowError, run_id: Uuid, steps: Vec<FlowStep>) -> Self {
        let mut api = match error {
            FlowError::Ipfs(_) => Self::bad_gateway(error.to_string()),
            FlowError::PreviousDocument(e) => Self::from_ipfs(e),
            FlowError::Chain(e) => Self::from_chain(e),
            FlowError::PreviousMetadata { .. } => Self::bad_gateway(error.to_string()),
        };
        api.message = error.to_string();
        api.flow = Some((run_id, steps));
        api
    }

    fn from_chain(e: &ChainError) -> Self {
        match e {
            ChainError::RateLimited(_) => Self::service_unavailable(e.to_string()),
            _ => Self::bad_gateway(e.to_string()),
        }
    }

    fn from_ipfs(e: &IpfsError) -> Self {
        match e {
            IpfsError::InvalidCid(_) => Self::bad_request(e.to_string()),
            IpfsError::Status { status: 404, .. } => Self::not_found(e.to_string()),
            _ => Self::bad_gateway(e.to_string()),
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        tracing::warn!(error = %e, "Chain request failed");
        Self::from_chain(&e)
    }
}

impl From<IpfsError> for ApiError {
    fn from(e: IpfsError) -> Self {
        tracing::warn!(error = %e, "IPFS request failed");
        Self::from_ipfs(&e)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self {
            fields: e.fields,
            ..Self::unprocessable("Validation failed")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (run_id, steps) = match self.flow {
            Some((run_id, steps)) => (Some(run_id), Some(steps)),
            None => (None, None),
        };
        let body = Json(ErrorBody {
            error: self.message,
            fields: self.fields,
            run_id,
            steps,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    use crate::flow::{FlowKind, FlowSteps};

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unp.message, "oops");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn chain_errors_map_to_upstream_statuses() {
        let limited: ApiError = ChainError::RateLimited("429".into()).into();
        assert_eq!(limited.status, StatusCode::SERVICE_UNAVAILABLE);

        let rpc: ApiError = ChainError::RpcError("connection reset".into()).into();
        assert_eq!(rpc.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn ipfs_errors_map_to_upstream_statuses() {
        let missing: ApiError = IpfsError::Status {
            status: 404,
            body: "not found".into(),
        }
        .into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let invalid: ApiError = IpfsError::InvalidCid("nope".into()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let error: ApiError = ValidationErrors {
            fields: vec![FieldError {
                field: "name".into(),
                message: "is required".into(),
            }],
        }
        .into();
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["fields"][0]["field"], "name");
    }

    #[tokio::test]
    async fn failed_flow_carries_steps() {
        let mut steps = FlowSteps::new(FlowKind::Mint);
        steps.start();
        steps.fail("pinning service returned 401");
        let error = FlowError::Ipfs(IpfsError::Status {
            status: 401,
            body: "unauthorized".into(),
        });

        let response =
            ApiError::flow_failed(&error, Uuid::nil(), steps.steps().to_vec()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["steps"][0]["state"], "error");
        assert_eq!(json["steps"][1]["state"], "pending");
    }

    #[test]
    fn only_previous_version_reads_surface_as_not_found() {
        let not_found = || IpfsError::Status {
            status: 404,
            body: "not found".into(),
        };

        let pinning = FlowError::Ipfs(not_found());
        let api = ApiError::flow_failed(&pinning, Uuid::nil(), Vec::new());
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);

        let previous = FlowError::PreviousDocument(not_found());
        let api = ApiError::flow_failed(&previous, Uuid::nil(), Vec::new());
        assert_eq!(api.status, StatusCode::NOT_FOUND);
    }
}
