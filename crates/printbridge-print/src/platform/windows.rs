// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Windows adapter.
//
// Printers are listed with `wmic printer get Name,Default,Status`, whose
// tabular output puts the columns in alphabetical order (Default, Name,
// Status) separated by runs of spaces.  Jobs go through the bundled
// SumatraPDF helper in print mode.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use printbridge_core::error::{GatewayError, Result};
use printbridge_core::types::{PrintOptions, PrinterDescriptor, StagedFile};
use regex::Regex;
use tracing::{debug, instrument, warn};

use super::{PlatformAdapter, validate_printer_name};
use crate::runner::{CommandRunner, JobCommand};

/// The helper takes the name as one argv entry, so any printable name the
/// spooler reports, including `\\server\queue` shares, is passed through.
const PRINTER_NAME_FORBIDDEN: &[char] = &[];

const WMIC: &str = "wmic";

/// Column separator in `wmic` tables: two or more whitespace characters.
static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("static regex is valid"));

/// Adapter for the Windows print spooler.
pub struct WindowsAdapter {
    runner: Arc<dyn CommandRunner>,
    helper: PathBuf,
    /// Whether the helper existed when the adapter was built.
    helper_present: bool,
}

impl WindowsAdapter {
    /// Build the adapter, probing for the helper once.
    pub fn new(runner: Arc<dyn CommandRunner>, helper: PathBuf) -> Self {
        let helper_present = helper.is_file();
        if !helper_present {
            warn!(helper = %helper.display(), "print helper not found; print jobs will fail");
        }
        Self {
            runner,
            helper,
            helper_present,
        }
    }

    async fn wmic(&self, args: &[&str]) -> Result<String> {
        let command = args.iter().fold(JobCommand::new(WMIC), |cmd, a| cmd.arg(a));
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
impl PlatformAdapter for WindowsAdapter {
    fn platform_name(&self) -> &str {
        "windows"
    }

    #[instrument(skip(self))]
    async fn enumerate_printers(&self) -> Result<Vec<PrinterDescriptor>> {
        let stdout = self.wmic(&["printer", "get", "Name,Default,Status"]).await?;
        let printers = parse_printer_table(&stdout);
        debug!(count = printers.len(), "wmic printers parsed");
        Ok(printers)
    }

    async fn default_printer(&self) -> Result<Option<String>> {
        let stdout = self
            .wmic(&["printer", "where", "Default=\"TRUE\"", "get", "Name"])
            .await?;
        Ok(parse_default_name(&stdout))
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
        if !self.helper_present {
            return Err(GatewayError::HelperMissing(self.helper.clone()));
        }

        let mut command = JobCommand::new(&self.helper);
        command = match printer {
            Some(name) => {
                self.check_printer_name(name)?;
                command.arg("-print-to").arg(name)
            }
            None => command.arg("-print-to-default"),
        };
        if let Some(range) = &options.page_range {
            command = command.arg("-print-settings").arg(format!("pages={range}"));
        }
        if options.copies > 1 || options.duplex {
            warn!(
                copies = options.copies,
                duplex = options.duplex,
                "copies and duplex are not forwarded to the Windows print helper"
            );
        }

        Ok(command.arg(&file.path))
    }

    fn success_message(&self) -> &str {
        "Printed successfully on Windows"
    }
}

/// Parse `wmic printer get Name,Default,Status` output.
///
/// The header line is skipped; rows with fewer than three columns are
/// dropped rather than treated as errors.
pub fn parse_printer_table(stdout: &str) -> Vec<PrinterDescriptor> {
    stdout
        .trim()
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = COLUMN_GAP.split(line.trim()).collect();
            if columns.len() < 3 {
                return None;
            }
            let status = match columns[2] {
                "" => "Unknown",
                s => s,
            };
            Some(PrinterDescriptor {
                name: columns[1].to_owned(),
                is_default: columns[0] == "TRUE",
                status: status.to_owned(),
            })
        })
        .collect()
}

/// Parse `wmic printer where Default="TRUE" get Name` output: the first
/// non-empty line after the `Name` header.
pub fn parse_default_name(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .nth(1)
        .map(str::to_owned)
}
