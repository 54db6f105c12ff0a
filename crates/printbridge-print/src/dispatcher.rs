// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job dispatch.
//
// One submission = one OS command.  The dispatcher resolves the destination,
// asks the platform adapter for the command, runs it to completion and then
// always discards the staged file: a failed print is retried by uploading
// again, never from a kept copy.

use std::sync::Arc;

use printbridge_core::error::{GatewayError, Result};
use printbridge_core::types::{PrintJobRequest, PrintOptions, StagedFile};
use tracing::{info, instrument, warn};

use crate::platform::PlatformAdapter;
use crate::runner::CommandRunner;
use crate::stager::discard;

/// Runs print jobs through the host's platform adapter.
#[derive(Clone)]
pub struct JobDispatcher {
    adapter: Arc<dyn PlatformAdapter>,
    runner: Arc<dyn CommandRunner>,
}

impl JobDispatcher {
    pub fn new(adapter: Arc<dyn PlatformAdapter>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { adapter, runner }
    }

    /// Submit one job and return the confirmation message.
    ///
    /// The staged file is removed whether the job succeeds or fails.
    #[instrument(skip_all, fields(platform = self.adapter.platform_name()))]
    pub async fn submit(&self, request: PrintJobRequest) -> Result<String> {
        let staged = request
            .staged_file
            .ok_or_else(|| GatewayError::validation("No file uploaded"))?;

        let outcome = self.execute(&staged, &request.options).await;
        discard(&staged.path).await;
        outcome
    }

    async fn execute(&self, staged: &StagedFile, options: &PrintOptions) -> Result<String> {
        let printer = match &options.printer_name {
            Some(name) => Some(name.clone()),
            None => self.resolve_default().await,
        };

        let command = self
            .adapter
            .build_job_command(staged, options, printer.as_deref())?;
        info!(command = %command, "submitting print job");

        let output = self.runner.run(&command).await.map_err(|e| {
            let program = command.program().to_string_lossy();
            GatewayError::JobExecution(format!("could not start {program}: {e}"))
        })?;

        if !output.success {
            let diagnostic = output.diagnostic();
            warn!(code = ?output.code, diagnostic = %diagnostic, "print command failed");
            return Err(GatewayError::JobExecution(diagnostic));
        }

        info!(printer = printer.as_deref().unwrap_or("<os default>"), "print job accepted");
        Ok(self.adapter.success_message().to_owned())
    }

    /// Ask the OS for its default printer; no usable default is not an
    /// error.
    async fn resolve_default(&self) -> Option<String> {
        let name = match self.adapter.default_printer().await {
            Ok(name) => name?,
            Err(e) => {
                warn!(error = %e, "default printer lookup failed; leaving destination to the OS");
                return None;
            }
        };
        match self.adapter.check_printer_name(&name) {
            Ok(()) => Some(name),
            Err(e) => {
                warn!(error = %e, "default printer cannot be named; leaving destination to the OS");
                None
            }
        }
    }
}
