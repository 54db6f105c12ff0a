// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer discovery.
//
// Every call asks the OS afresh; printers come and go while the gateway
// runs, so nothing is cached.

use std::sync::Arc;

use printbridge_core::error::Result;
use printbridge_core::types::PrinterDescriptor;
use tracing::info;

use crate::platform::PlatformAdapter;

/// Lists the printers visible to the host.
#[derive(Clone)]
pub struct PrinterDirectory {
    adapter: Arc<dyn PlatformAdapter>,
}

impl PrinterDirectory {
    pub fn new(adapter: Arc<dyn PlatformAdapter>) -> Self {
        Self { adapter }
    }

    /// Current printers in the order the OS reports them.
    pub async fn list(&self) -> Result<Vec<PrinterDescriptor>> {
        let printers = self.adapter.enumerate_printers().await?;
        info!(
            platform = self.adapter.platform_name(),
            count = printers.len(),
            "printers discovered"
        );
        Ok(printers)
    }

    /// The printer flagged as default, if any.
    pub async fn default_printer(&self) -> Result<Option<PrinterDescriptor>> {
        Ok(self.list().await?.into_iter().find(|p| p.is_default))
    }
}
