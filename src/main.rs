// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use artcertify_server::{
    api::router,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Grace period for in-flight requests (a mint waits for its receipt).
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received SIGINT, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, host = %config.host, "Failed to parse bind address");
            return ExitCode::FAILURE;
        }
    };
    let tls = config.tls.clone();

    tracing::info!(
        chain_id = config.network.chain_id,
        network = %config.network.name,
        contract = %config.sbt_contract,
        gateway = %config.ipfs_gateway,
        "Starting ArtCertify server"
    );

    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            return ExitCode::FAILURE;
        }
    };
    let app = router(state);

    let served = match tls {
        Some((cert, key)) => {
            if rustls::crypto::ring::default_provider().install_default().is_err() {
                tracing::warn!("A rustls crypto provider was already installed");
            }
            let tls_config = match RustlsConfig::from_pem_file(&cert, &key).await {
                Ok(tls_config) => tls_config,
                Err(e) => {
                    tracing::error!(error = %e, cert = %cert.display(), "Failed to load TLS certificate");
                    return ExitCode::FAILURE;
                }
            };

            let handle = Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            tracing::info!(%addr, "Listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!(%addr, "Listening on http (docs at /docs)");
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
            }
            Err(e) => Err(e),
        },
    };

    match served {
        Ok(()) => {
            tracing::info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
