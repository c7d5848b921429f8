// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public client configuration.

use axum::{extract::State, Json};

use crate::{ipfs::cid::gateway_base, models::PublicConfig, state::AppState};

/// Chain, contract and gateway settings the dashboard needs.
#[utoipa::path(
    get,
    path = "/v1/config",
    tag = "Config",
    responses(
        (status = 200, description = "Public configuration", body = PublicConfig)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> Json<PublicConfig> {
    let config = &state.config;
    Json(PublicConfig {
        chain_id: config.network.chain_id,
        network_name: config.network.name.clone(),
        explorer_url: config.network.explorer_url.clone(),
        sbt_contract: config.sbt_contract.to_checksum(None),
        ipfs_gateway: gateway_base(&config.ipfs_gateway),
        privy_app_id: config.privy_app_id.clone(),
        writes_enabled: state.write_clients().is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exposes_network_and_contract() {
        let Json(config) = get_config(State(AppState::for_tests())).await;
        assert_eq!(config.chain_id, 8453);
        assert_eq!(
            config.sbt_contract,
            "0x1111111111111111111111111111111111111111"
        );
        assert!(!config.writes_enabled);
        assert!(config.privy_app_id.is_none());
        assert_eq!(config.ipfs_gateway, "https://gateway.pinata.cloud");
    }
}
