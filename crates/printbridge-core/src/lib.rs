// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintBridge: core types, error definitions and configuration shared by
// the gateway crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::GatewayConfig;
pub use error::{ErrorCategory, GatewayError};
pub use types::*;
