// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the PrintBridge gateway.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Highest copy count accepted from a client.
pub const MAX_COPIES: u32 = 999;

/// A printer as reported by the host's print subsystem.
///
/// Built fresh on every discovery call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDescriptor {
    pub name: String,
    pub is_default: bool,
    pub status: String,
}

/// One contiguous span of a page range, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpan {
    pub start: u32,
    pub end: u32,
}

/// A validated page selection such as `1-3,5`.
///
/// Only digits, commas and dashes survive parsing, so the rendered form is
/// safe to hand to any OS print tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    spans: Vec<PageSpan>,
}

impl PageRange {
    pub fn spans(&self) -> &[PageSpan] {
        &self.spans
    }
}

impl FromStr for PageRange {
    type Err = GatewayError;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || GatewayError::validation(format!("invalid pageRange: {raw:?}"));

        let mut spans = Vec::new();
        for item in raw.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(invalid());
            }
            let (start, end) = match item.split_once('-') {
                Some((a, b)) => (parse_page(a.trim()), parse_page(b.trim())),
                None => (parse_page(item), parse_page(item)),
            };
            match (start, end) {
                (Some(start), Some(end)) if start <= end => spans.push(PageSpan { start, end }),
                _ => return Err(invalid()),
            }
        }

        Ok(Self { spans })
    }
}

fn parse_page(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().filter(|n| *n >= 1)
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if span.start == span.end {
                write!(f, "{}", span.start)?;
            } else {
                write!(f, "{}-{}", span.start, span.end)?;
            }
        }
        Ok(())
    }
}

/// Client-selected settings for one print submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOptions {
    /// Explicit destination; `None` lets the dispatcher resolve the default.
    pub printer_name: Option<String>,
    pub copies: u32,
    pub duplex: bool,
    pub page_range: Option<PageRange>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            printer_name: None,
            copies: 1,
            duplex: false,
            page_range: None,
        }
    }
}

impl PrintOptions {
    /// Validate raw query-string values.
    ///
    /// Absent and empty values fall back to the defaults (one copy, simplex,
    /// all pages, OS default printer).
    pub fn parse(
        printer: Option<&str>,
        copies: Option<&str>,
        duplex: Option<&str>,
        page_range: Option<&str>,
    ) -> Result<Self> {
        let printer_name = printer
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned);

        let copies = match copies.map(str::trim).filter(|c| !c.is_empty()) {
            None => 1,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_COPIES).contains(n))
                .ok_or_else(|| {
                    GatewayError::validation(format!(
                        "invalid copies: {raw:?} (expected an integer from 1 to {MAX_COPIES})"
                    ))
                })?,
        };

        let duplex = match duplex.map(|d| d.trim().to_ascii_lowercase()).as_deref() {
            None | Some("" | "false" | "0" | "no") => false,
            Some("true" | "1" | "yes") => true,
            Some(other) => {
                return Err(GatewayError::validation(format!(
                    "invalid duplex: {other:?} (expected true or false)"
                )));
            }
        };

        let page_range = page_range
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::parse::<PageRange>)
            .transpose()?;

        Ok(Self {
            printer_name,
            copies,
            duplex,
            page_range,
        })
    }
}

/// An uploaded document held in the staging directory.
///
/// Owned by the gateway process; removed by the dispatcher once its job ends
/// or by the reaper once it outlives the retention window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Everything the dispatcher needs to run one print job.
#[derive(Debug, Clone)]
pub struct PrintJobRequest {
    /// `None` when the submission carried no file.
    pub staged_file: Option<StagedFile>,
    pub options: PrintOptions,
}

impl PrintJobRequest {
    pub fn new(staged_file: Option<StagedFile>, options: PrintOptions) -> Self {
        Self {
            staged_file,
            options,
        }
    }
}
