// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform adapters: one implementation per host print subsystem.
//
// The adapter is chosen once at startup from the host OS and shared by the
// printer directory and the job dispatcher.  Adding a platform means adding
// an implementation here, not touching the callers.

pub mod cups;
pub mod unsupported;
pub mod windows;

use std::sync::Arc;

use async_trait::async_trait;
use printbridge_core::config::GatewayConfig;
use printbridge_core::error::{GatewayError, Result};
use printbridge_core::types::{PrintOptions, PrinterDescriptor, StagedFile};
use tracing::info;

use crate::runner::{CommandRunner, JobCommand};

pub use cups::CupsAdapter;
pub use unsupported::UnsupportedAdapter;
pub use windows::WindowsAdapter;

/// Longest printer name accepted from a client.
pub const MAX_PRINTER_NAME_LEN: usize = 127;

/// OS-specific printer enumeration and job-command construction.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Short platform label used in logs.
    fn platform_name(&self) -> &str;

    /// List every printer the OS knows about.
    async fn enumerate_printers(&self) -> Result<Vec<PrinterDescriptor>>;

    /// Ask the OS for its current default destination.
    ///
    /// `Ok(None)` means the OS has no default configured.
    async fn default_printer(&self) -> Result<Option<String>>;

    /// Reject a printer name this platform's tools cannot take as a
    /// destination.
    fn check_printer_name(&self, name: &str) -> Result<()>;

    /// Build the command that submits `file` with `options`.
    ///
    /// `printer` is the resolved destination; `None` leaves the choice to the
    /// OS default.
    fn build_job_command(
        &self,
        file: &StagedFile,
        options: &PrintOptions,
        printer: Option<&str>,
    ) -> Result<JobCommand>;

    /// Confirmation returned to the client after a successful job.
    fn success_message(&self) -> &str;
}

/// Select the adapter for the OS this process runs on.
pub fn host_adapter(
    config: &GatewayConfig,
    runner: Arc<dyn CommandRunner>,
) -> Arc<dyn PlatformAdapter> {
    adapter_for_os(std::env::consts::OS, config, runner)
}

/// Select the adapter for `os` (a `std::env::consts::OS` value).
pub fn adapter_for_os(
    os: &str,
    config: &GatewayConfig,
    runner: Arc<dyn CommandRunner>,
) -> Arc<dyn PlatformAdapter> {
    let adapter: Arc<dyn PlatformAdapter> = match os {
        "windows" => Arc::new(WindowsAdapter::new(runner, config.print_helper.clone())),
        "macos" | "linux" => Arc::new(CupsAdapter::new(runner)),
        other => Arc::new(UnsupportedAdapter::new(other)),
    };
    info!(os, adapter = adapter.platform_name(), "platform adapter selected");
    adapter
}

/// Check a printer name before it reaches an OS tool.
///
/// Control characters and the platform's `forbidden` characters are
/// rejected.  Names may not start with `-`, so they can never be mistaken
/// for an option.
pub(crate) fn validate_printer_name(name: &str, forbidden: &[char]) -> Result<()> {
    let rejected = || GatewayError::validation(format!("invalid printer name: {name:?}"));

    if name.is_empty() || name.len() > MAX_PRINTER_NAME_LEN || name.starts_with('-') {
        return Err(rejected());
    }
    if name.chars().any(|c| c.is_control() || forbidden.contains(&c)) {
        return Err(rejected());
    }
    Ok(())
}
