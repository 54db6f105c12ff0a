// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CUPS adapter for macOS and Linux.
//
// `lpstat -a` lists the destinations accepting jobs, `lpstat -d` names the
// system default, and `lp` submits the document.  CUPS reports no finer
// status through these tools, so every destination is "Available".

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use printbridge_core::error::{GatewayError, Result};
use printbridge_core::types::{PrintOptions, PrinterDescriptor, StagedFile};
use regex::Regex;
use tracing::{debug, instrument, warn};

use super::{PlatformAdapter, validate_printer_name};
use crate::runner::{CommandRunner, JobCommand};

/// Characters CUPS does not accept in destination names.
const PRINTER_NAME_FORBIDDEN: &[char] = &[' ', '/', '\\', '#', '\'', '"'];

const STATUS_AVAILABLE: &str = "Available";

/// `sides` value used for duplex jobs.
const DUPLEX_SIDES: &str = "sides=two-sided-long-edge";

static DEFAULT_DESTINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"system default destination: (.+)").expect("static regex is valid")
});

/// Adapter for CUPS-based systems.
pub struct CupsAdapter {
    runner: Arc<dyn CommandRunner>,
}

impl CupsAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Run `lpstat` in the C locale so its messages match our patterns.
    async fn lpstat(&self, flag: &str) -> Result<String> {
        let command = JobCommand::new("lpstat").arg(flag).env("LC_ALL", "C");
        let output = self
            .runner
            .run(&command)
            .await
            .map_err(|e| GatewayError::Enumeration(format!("could not run {command}: {e}")))?;
        if !output.success {
            return Err(GatewayError::Enumeration(output.diagnostic()));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl PlatformAdapter for CupsAdapter {
    fn platform_name(&self) -> &str {
        "cups"
    }

    #[instrument(skip(self))]
    async fn enumerate_printers(&self) -> Result<Vec<PrinterDescriptor>> {
        let listing = self.lpstat("-a").await?;

        // A missing default is not fatal for a listing.
        let default = match self.default_printer().await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "could not query the default destination");
                None
            }
        };

        let printers: Vec<PrinterDescriptor> = parse_destinations(&listing)
            .into_iter()
            .map(|name| PrinterDescriptor {
                is_default: default.as_deref() == Some(name.as_str()),
                name,
                status: STATUS_AVAILABLE.to_owned(),
            })
            .collect();

        debug!(count = printers.len(), default = ?default, "lpstat destinations parsed");
        Ok(printers)
    }

    async fn default_printer(&self) -> Result<Option<String>> {
        let stdout = self.lpstat("-d").await?;
        Ok(parse_default_destination(&stdout))
    }

    fn check_printer_name(&self, name: &str) -> Result<()> {
        validate_printer_name(name, PRINTER_NAME_FORBIDDEN)
    }

    fn build_job_command(
        &self,
        file: &StagedFile,
        options: &PrintOptions,
        printer: Option<&str>,
    ) -> Result<JobCommand> {
        let mut command = JobCommand::new("lp");
        if let Some(name) = printer {
            self.check_printer_name(name)?;
            command = command.arg("-d").arg(name);
        }
        if options.copies > 1 {
            command = command.arg("-n").arg(options.copies.to_string());
        }
        if options.duplex {
            command = command.arg("-o").arg(DUPLEX_SIDES);
        }
        if let Some(range) = &options.page_range {
            command = command.arg("-P").arg(range.to_string());
        }
        Ok(command.arg(&file.path))
    }

    fn success_message(&self) -> &str {
        "Printed successfully on Unix system"
    }
}

/// Destination names from `lpstat -a`: the first space-delimited token of
/// each non-empty line.
pub fn parse_destinations(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.split(' ').next())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

/// The default destination from `lpstat -d`, if one is configured.
pub fn parse_default_destination(stdout: &str) -> Option<String> {
    DEFAULT_DESTINATION
        .captures(stdout)
        .map(|caps| caps[1].trim().to_owned())
        .filter(|name| !name.is_empty())
}
