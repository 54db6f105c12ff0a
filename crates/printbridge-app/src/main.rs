// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintBridge: local HTTP print gateway
//
// Entry point. Initialises logging, reads the configuration from the
// environment, wires the backend services and serves until Ctrl-C.

mod services;

use std::process::ExitCode;

use printbridge_core::GatewayConfig;
use tokio_util::sync::CancellationToken;

use services::app_services::AppServices;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "PrintBridge starting");

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "cannot start without a valid configuration");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    match AppServices::init(config).run(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gateway terminated");
            ExitCode::FAILURE
        }
    }
}

/// Cancel `shutdown` on the first Ctrl-C.
async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C; graceful shutdown unavailable");
        return;
    }
    tracing::info!("shutdown requested");
    shutdown.cancel();
}
