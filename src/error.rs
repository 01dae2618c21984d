// SPDX-License-Identifier: MIT
//! Scan error taxonomy.
//!
//! Every fallible core operation returns `Result<_, ScanError>`. The batch
//! runner converts errors into per-target result entries; single-target
//! callers (CLI, REST, MCP) propagate them to the adapter, which owns the
//! user-visible translation (exit code, HTTP status, JSON-RPC error).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// The axe-core release feed or CDN could not be reached, timed out,
    /// or returned an unusable payload.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Browser choice outside {chrome, firefox}.
    #[error("unsupported browser '{0}' (expected 'chrome' or 'firefox')")]
    UnsupportedBrowser(String),

    /// Engine choice outside {selenium, playwright}.
    #[error("unsupported engine '{0}' (expected 'selenium' or 'playwright')")]
    UnsupportedEngine(String),

    /// The audit script did not register in the page after injection.
    #[error("audit engine failed to register in the page after injection")]
    InjectionFailed,

    /// Underlying browser-session error (driver, CDP, or page evaluation).
    #[error("browser session error: {0}")]
    DriverFailure(String),

    /// Navigation to the target failed.
    #[error("could not reach target {url}: {reason}")]
    TargetUnreachable { url: String, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Machine-readable error code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::UpstreamUnavailable(_) => "upstream_unavailable",
            ScanError::UnsupportedBrowser(_) => "unsupported_browser",
            ScanError::UnsupportedEngine(_) => "unsupported_engine",
            ScanError::InjectionFailed => "injection_failed",
            ScanError::DriverFailure(_) => "driver_failure",
            ScanError::TargetUnreachable { .. } => "target_unreachable",
            ScanError::Io(_) => "io_error",
        }
    }
}
