// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staging-directory reaper.
//
// Uploads whose job never ran (client went away, dispatcher crashed) would
// pile up forever.  Once per sweep interval every staged upload older than
// the retention window is deleted.  Files the stager did not name are
// never touched.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use printbridge_core::config::GatewayConfig;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::stager::{DiscardOutcome, STAGED_PREFIX, discard};

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
}

/// Background task that deletes stale uploads.
#[derive(Debug, Clone)]
pub struct Reaper {
    staging_dir: PathBuf,
    retention: Duration,
    interval: Duration,
}

impl Reaper {
    pub fn new(staging_dir: impl Into<PathBuf>, retention: Duration, interval: Duration) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            retention,
            interval,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.staging_dir, config.retention, config.sweep_interval)
    }

    /// Sweep periodically until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            dir = %self.staging_dir.display(),
            retention_secs = self.retention.as_secs(),
            interval_secs = self.interval.as_secs(),
            "reaper starting"
        );

        let mut interval = tokio::time::interval(self.interval);
        // The first tick fires immediately; nothing can be stale yet.
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("reaper shutting down");
                    break;
                }

                _ = interval.tick() => {
                    let report = self.sweep().await;
                    if report.removed > 0 {
                        info!(removed = report.removed, scanned = report.scanned, "stale uploads reclaimed");
                    }
                }
            }
        }
    }

    /// One sweep against the current wall clock.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// One sweep, judging ages relative to `now`.
    ///
    /// Errors on individual entries are logged and skipped; a missing
    /// staging directory simply means there is nothing to do.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!(dir = %self.staging_dir.display(), error = %e, "cannot read staging directory");
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "staging directory listing interrupted");
                    break;
                }
            };
            if !entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(STAGED_PREFIX))
            {
                continue;
            }
            let path = entry.path();
            let Some(born) = birth_time(&path).await else {
                continue;
            };
            report.scanned += 1;

            // A clock that moved backwards makes the file look new; keep it.
            let age = now.duration_since(born).unwrap_or_default();
            if age > self.retention {
                debug!(path = %path.display(), age_secs = age.as_secs(), "removing stale upload");
                if discard(&path).await == DiscardOutcome::Removed {
                    report.removed += 1;
                }
            }
        }

        report
    }
}

/// Creation time of a regular file, falling back to its modification time
/// where the filesystem does not record creation.
async fn birth_time(path: &Path) -> Option<SystemTime> {
    let meta = fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    meta.created().or_else(|_| meta.modified()).ok()
}
