// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gateway configuration, read once from the process environment at startup.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Listening port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3001;

/// Maximum age of a staged upload before the reaper reclaims it.
pub const RETENTION_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Period of the reaper sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Upload body limit when `PRINTBRIDGE_MAX_UPLOAD_BYTES` is unset.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024; // 64 MiB

/// File name of the Windows PDF print helper.
pub const PRINT_HELPER_FILE: &str = "SumatraPDF.exe";

const ENV_PORT: &str = "PORT";
const ENV_AUTH_TOKEN: &str = "AUTH_TOKEN";
const ENV_BIND: &str = "PRINTBRIDGE_BIND";
const ENV_STAGING_DIR: &str = "PRINTBRIDGE_STAGING_DIR";
const ENV_PRINT_HELPER: &str = "PRINTBRIDGE_PRINT_HELPER";
const ENV_MAX_UPLOAD_BYTES: &str = "PRINTBRIDGE_MAX_UPLOAD_BYTES";

/// Process-wide settings shared by every gateway component.
///
/// Constructed once and never mutated afterwards; components receive it
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Shared secret expected in `Authorization: Bearer <token>`.
    pub auth_token: String,
    /// Where uploads are staged. Created lazily by the stager.
    pub staging_dir: PathBuf,
    /// Windows PDF print helper binary.
    pub print_helper: PathBuf,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub max_upload_bytes: usize,
}

impl GatewayConfig {
    /// Build the configuration from the real process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let port = match get(ENV_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| GatewayError::Config(format!("{ENV_PORT}={raw:?}: {e}")))?,
            None => DEFAULT_PORT,
        };

        let auth_token = get(ENV_AUTH_TOKEN)
            .ok_or_else(|| GatewayError::Config(format!("{ENV_AUTH_TOKEN} must be set")))?;

        let bind_addr = match get(ENV_BIND) {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|e| GatewayError::Config(format!("{ENV_BIND}={raw:?}: {e}")))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let staging_dir = match get(ENV_STAGING_DIR) {
            Some(raw) => absolute(Path::new(&raw))?,
            None => default_staging_dir(),
        };

        let print_helper = match get(ENV_PRINT_HELPER) {
            Some(raw) => PathBuf::from(raw),
            None => default_print_helper(),
        };

        let max_upload_bytes = match get(ENV_MAX_UPLOAD_BYTES) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    GatewayError::Config(format!(
                        "{ENV_MAX_UPLOAD_BYTES}={raw:?}: expected a positive byte count"
                    ))
                })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            bind_addr,
            port,
            auth_token,
            staging_dir,
            print_helper,
            retention: RETENTION_WINDOW,
            sweep_interval: SWEEP_INTERVAL,
            max_upload_bytes,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| GatewayError::Config(format!("{ENV_STAGING_DIR}={}: {e}", path.display())))
}

/// `<platform data dir>/printbridge/uploads`, e.g. `~/.local/share` on
/// Linux, `~/Library/Application Support` on macOS, `%APPDATA%` on Windows.
fn default_staging_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("printbridge")
        .join("uploads")
}

/// The helper ships next to the executable, or in a `resources/` directory
/// beside it in packaged builds.
fn default_print_helper() -> PathBuf {
    let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    else {
        return PathBuf::from(PRINT_HELPER_FILE);
    };

    let beside = exe_dir.join(PRINT_HELPER_FILE);
    let packaged = exe_dir.join("resources").join(PRINT_HELPER_FILE);
    if !beside.is_file() && packaged.is_file() {
        packaged
    } else {
        beside
    }
}
