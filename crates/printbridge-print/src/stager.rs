// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload staging.
//
// Each upload gets its own file in the staging directory, named
// `upload-<uuid>[.ext]` and opened with `create_new`, so concurrent uploads
// can never share or overwrite a path.  The directory itself is created on
// first use.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use chrono::Utc;
use printbridge_core::error::{GatewayError, Result};
use printbridge_core::types::StagedFile;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Prefix shared by every staged upload.
pub const STAGED_PREFIX: &str = "upload-";

/// Longest file extension carried over from the client's file name.
const MAX_EXTENSION_LEN: usize = 8;

/// What happened when a staged file was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardOutcome {
    Removed,
    /// Someone else (dispatcher or reaper) got there first.
    AlreadyGone,
    /// Removal failed for another reason; already logged.
    Failed,
}

/// Delete a staged file, treating "already absent" as success.
///
/// Never returns an error: unexpected failures are logged and reported via
/// [`DiscardOutcome::Failed`] only.
pub async fn discard(path: &Path) -> DiscardOutcome {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "staged file removed");
            DiscardOutcome::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => DiscardOutcome::AlreadyGone,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove staged file");
            DiscardOutcome::Failed
        }
    }
}

/// Writes uploads into the staging directory.
#[derive(Debug, Clone)]
pub struct FileStager {
    dir: PathBuf,
}

impl FileStager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Stream a multipart field to a fresh staged file.
    ///
    /// A broken upload stream is a validation error; the partial file is
    /// removed before returning.
    #[instrument(skip_all, fields(file_name = field.file_name().unwrap_or("")))]
    pub async fn stage_field(&self, mut field: Field<'_>) -> Result<StagedFile> {
        let (staged, mut file) = self.create(field.file_name()).await?;

        let mut bytes = 0usize;
        let written: Result<()> = async {
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| GatewayError::validation(format!("upload interrupted: {e}")))?
            {
                bytes += chunk.len();
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = written {
            drop(file);
            discard(&staged.path).await;
            return Err(e);
        }

        info!(path = %staged.path.display(), bytes, "upload staged");
        Ok(staged)
    }

    /// Stage an in-memory document.
    #[cfg(test)]
    pub(crate) async fn stage_bytes(&self, file_name: Option<&str>, data: &[u8]) -> Result<StagedFile> {
        let (staged, mut file) = self.create(file_name).await?;
        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            discard(&staged.path).await;
            return Err(e.into());
        }

        debug!(path = %staged.path.display(), bytes = data.len(), "document staged");
        Ok(staged)
    }

    /// Reserve a new, unique path in the staging directory.
    async fn create(&self, file_name: Option<&str>) -> Result<(StagedFile, File)> {
        fs::create_dir_all(&self.dir).await?;

        let name = match file_name.and_then(safe_extension) {
            Some(ext) => format!("{STAGED_PREFIX}{}.{ext}", Uuid::new_v4().simple()),
            None => format!("{STAGED_PREFIX}{}", Uuid::new_v4().simple()),
        };
        let path = self.dir.join(name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok((
            StagedFile {
                path,
                created_at: Utc::now(),
            },
            file,
        ))
    }
}

/// The client's file extension, lower-cased, if it is short and plain.
fn safe_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    let plain = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.bytes().all(|b| b.is_ascii_alphanumeric());
    plain.then(|| ext.to_ascii_lowercase())
}
