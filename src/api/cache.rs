// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::Auth, blockchain::SbtReader, models::CacheInvalidatedResponse, state::AppState,
};

/// Drop every cached contract read so the next listing hits the chain.
///
/// IPFS documents are content-addressed and stay cached.
#[utoipa::path(
    post,
    path = "/v1/cache/invalidate",
    tag = "Cache",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Read cache cleared", body = CacheInvalidatedResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn invalidate_cache(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Json<CacheInvalidatedResponse> {
    let cleared = state.chain.cache().len();
    state.chain.invalidate_cache();
    tracing::info!(user_id = %user.user_id, cleared, "Contract read cache invalidated");
    Json(CacheInvalidatedResponse { cleared })
}
