// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adapter for hosts without a known print subsystem.
//
// Every operation fails with `UnsupportedPlatform`; nothing is ever run.

use async_trait::async_trait;
use printbridge_core::error::{GatewayError, Result};
use printbridge_core::types::{PrintOptions, PrinterDescriptor, StagedFile};

use super::PlatformAdapter;
use crate::runner::JobCommand;

/// No-op adapter returned on unrecognised operating systems.
pub struct UnsupportedAdapter {
    os: String,
}

impl UnsupportedAdapter {
    pub fn new(os: impl Into<String>) -> Self {
        Self { os: os.into() }
    }

    fn error(&self) -> GatewayError {
        tracing::warn!(os = %self.os, "print operation requested on unsupported platform");
        GatewayError::UnsupportedPlatform(self.os.clone())
    }
}

#[async_trait]
impl PlatformAdapter for UnsupportedAdapter {
    fn platform_name(&self) -> &str {
        "unsupported"
    }

    async fn enumerate_printers(&self) -> Result<Vec<PrinterDescriptor>> {
        Err(self.error())
    }

    async fn default_printer(&self) -> Result<Option<String>> {
        Err(self.error())
    }

    fn check_printer_name(&self, _name: &str) -> Result<()> {
        Err(self.error())
    }

    fn build_job_command(
        &self,
        _file: &StagedFile,
        _options: &PrintOptions,
        _printer: Option<&str>,
    ) -> Result<JobCommand> {
        Err(self.error())
    }

    fn success_message(&self) -> &str {
        "Printed successfully"
    }
}
