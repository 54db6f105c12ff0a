// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: builds every gateway component once from the
// startup configuration and runs the HTTP server and the reaper together.
//
// The platform adapter is selected here, once, from the host OS.  The
// directory and the dispatcher share it, and every external command goes
// through the same runner.

use std::sync::Arc;

use printbridge_core::GatewayConfig;
use printbridge_core::error::Result;
use printbridge_print::http_server::{self, GatewayServer, GatewayState};
use printbridge_print::{
    AuthGate, CommandRunner, FileStager, JobDispatcher, PrinterDirectory, Reaper, SystemRunner,
    host_adapter,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Fully wired gateway, ready to run.
pub struct AppServices {
    config: Arc<GatewayConfig>,
    state: Arc<GatewayState>,
    reaper: Reaper,
}

impl AppServices {
    /// Wire the services against the real OS tools.
    pub fn init(config: GatewayConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Wire the services with a specific command runner.
    pub fn with_runner(config: GatewayConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let config = Arc::new(config);
        let adapter = host_adapter(&config, runner.clone());

        let state = GatewayState {
            auth: AuthGate::new(config.auth_token.as_str()),
            directory: PrinterDirectory::new(adapter.clone()),
            stager: FileStager::new(&config.staging_dir),
            dispatcher: JobDispatcher::new(adapter, runner),
        };

        info!(
            addr = %config.socket_addr(),
            staging_dir = %config.staging_dir.display(),
            "app services initialised"
        );

        Self {
            reaper: Reaper::from_config(&config),
            state: Arc::new(state),
            config,
        }
    }

    /// Serve HTTP and sweep stale uploads until `shutdown` is cancelled.
    ///
    /// A server failure also stops the reaper.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let reaper = tokio::spawn(self.reaper.run(shutdown.child_token()));

        let router = http_server::router(self.state, self.config.max_upload_bytes);
        let served = match GatewayServer::bind(self.config.socket_addr(), router).await {
            Ok(server) => server.serve(shutdown.clone()).await,
            Err(e) => Err(e),
        };

        shutdown.cancel();
        if let Err(e) = reaper.await {
            warn!(error = %e, "reaper task ended abnormally");
        }
        served
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(staging: &std::path::Path) -> GatewayConfig {
        let staging = staging.to_string_lossy().into_owned();
        GatewayConfig::from_lookup(|key| match key {
            "AUTH_TOKEN" => Some("secret".to_owned()),
            "PORT" => Some("0".to_owned()),
            "PRINTBRIDGE_STAGING_DIR" => Some(staging.clone()),
            _ => None,
        })
        .expect("config")
    }

    #[tokio::test]
    async fn runs_until_cancelled() {
        let staging = tempfile::tempdir().expect("tempdir");
        let services = AppServices::init(config(staging.path()));

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(services.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("stopped in time")
            .expect("join")
            .expect("clean shutdown");
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let staging = tempfile::tempdir().expect("tempdir");
        let taken = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = taken.local_addr().expect("addr").port().to_string();

        let staging_dir = staging.path().to_string_lossy().into_owned();
        let config = GatewayConfig::from_lookup(|key| match key {
            "AUTH_TOKEN" => Some("secret".to_owned()),
            "PORT" => Some(port.clone()),
            "PRINTBRIDGE_STAGING_DIR" => Some(staging_dir.clone()),
            _ => None,
        })
        .expect("config");

        let result = AppServices::init(config).run(CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
