// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for PrintBridge.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    // -- Request gate --
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Validation(String),

    // -- Platform --
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("print helper not found at {}", .0.display())]
    HelperMissing(PathBuf),

    #[error("printer enumeration failed: {0}")]
    Enumeration(String),

    #[error("configuration error: {0}")]
    Config(String),

    // -- Job execution --
    #[error("{0}")]
    JobExecution(String),

    // -- Staging / cleanup --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or mismatching credential.
    Auth,
    /// Missing upload or malformed parameters.
    Validation,
    /// Unsupported OS, missing helper binary, enumeration failure.
    Platform,
    /// The print command could not start or exited non-zero.
    JobExecution,
    /// Staging or cleanup I/O.
    Io,
}

impl GatewayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized(_) => ErrorCategory::Auth,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::UnsupportedPlatform(_)
            | Self::HelperMissing(_)
            | Self::Enumeration(_)
            | Self::Config(_) => ErrorCategory::Platform,
            Self::JobExecution(_) => ErrorCategory::JobExecution,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GatewayError>;
