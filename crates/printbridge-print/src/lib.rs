// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintBridge Print: platform print adapters, upload staging, job dispatch,
// stale-upload reaping and the HTTP gateway that ties them together.

pub mod auth;
pub mod directory;
pub mod dispatcher;
pub mod http_server;
pub mod platform;
pub mod reaper;
pub mod runner;
pub mod stager;

#[cfg(test)]
mod testing;

pub use auth::AuthGate;
pub use directory::PrinterDirectory;
pub use dispatcher::JobDispatcher;
pub use http_server::{GatewayServer, GatewayState};
pub use platform::{PlatformAdapter, host_adapter};
pub use reaper::Reaper;
pub use runner::{CommandRunner, SystemRunner};
pub use stager::FileStager;
