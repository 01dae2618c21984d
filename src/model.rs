// SPDX-License-Identifier: MIT
//! Scan data model types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScanError;
use crate::target::MaterializedHtml;

// ─── Browser & engine choice ─────────────────────────────────────────────────

/// Which browser the scan drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Firefox,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
        }
    }
}

impl FromStr for Browser {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(Browser::Chrome),
            "firefox" => Ok(Browser::Firefox),
            other => Err(ScanError::UnsupportedBrowser(other.to_string())),
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which scan backend drives the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Attach to a live WebDriver endpoint (chromedriver/geckodriver).
    Selenium,
    /// Launch a browser process and script it over CDP.
    Playwright,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Selenium => "selenium",
            Engine::Playwright => "playwright",
        }
    }
}

impl FromStr for Engine {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "selenium" => Ok(Engine::Selenium),
            "playwright" => Ok(Engine::Playwright),
            other => Err(ScanError::UnsupportedEngine(other.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-scan options shared by both backends.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub browser: Browser,
    pub headless: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            browser: Browser::Chrome,
            headless: true,
        }
    }
}

// ─── Targets ─────────────────────────────────────────────────────────────────

/// A scannable unit — a remote URL or a materialized local HTML file.
#[derive(Debug)]
pub enum ScanTarget {
    RemoteUrl(String),
    LocalHtml(MaterializedHtml),
}

impl ScanTarget {
    /// URL the browser navigates to.
    pub fn navigable_url(&self) -> String {
        match self {
            ScanTarget::RemoteUrl(url) => url.clone(),
            ScanTarget::LocalHtml(html) => html.file_url(),
        }
    }

    /// Stable identifier used as the result-map key.
    pub fn identifier(&self) -> String {
        match self {
            ScanTarget::RemoteUrl(url) => url.clone(),
            ScanTarget::LocalHtml(html) => html.path().display().to_string(),
        }
    }
}

// ─── Violations & results ────────────────────────────────────────────────────

/// Severity reported by axe-core for a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Minor,
    Moderate,
    Serious,
    Critical,
    /// Missing or unrecognised impact string in the raw engine output.
    #[serde(other)]
    Unknown,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Minor => "minor",
            Impact::Moderate => "moderate",
            Impact::Serious => "serious",
            Impact::Critical => "critical",
            Impact::Unknown => "unknown",
        }
    }
}

impl From<&str> for Impact {
    fn from(s: &str) -> Self {
        match s {
            "minor" => Impact::Minor,
            "moderate" => Impact::Moderate,
            "serious" => Impact::Serious,
            "critical" => Impact::Critical,
            _ => Impact::Unknown,
        }
    }
}

/// One reported accessibility rule failure. Derived from the raw engine
/// output at scan time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub id: String,
    pub impact: Impact,
    pub description: String,
    pub affected_node_count: usize,
}

impl Violation {
    /// Build a `Violation` from one entry of the raw `axe.run()` output.
    fn from_raw(raw: &Value) -> Self {
        Self {
            id: raw
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            impact: raw
                .get("impact")
                .and_then(Value::as_str)
                .map(Impact::from)
                .unwrap_or(Impact::Unknown),
            description: raw
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            affected_node_count: raw
                .get("nodes")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
        }
    }
}

/// Extract the ordered violation list from a raw `axe.run()` result.
/// A missing or malformed `violations` field yields an empty list.
pub fn parse_violations(raw: &Value) -> Vec<Violation> {
    raw.get("violations")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(Violation::from_raw).collect())
        .unwrap_or_default()
}

/// The outcome of a successful single-target scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Target identifier (URL or materialized file path).
    pub target: String,
    pub engine: Engine,
    pub browser: Browser,
    /// Ordered violation list, as reported by the engine.
    pub violations: Vec<Violation>,
    /// Base64-encoded PNG screenshot (standard alphabet, no line breaks).
    pub screenshot: String,
    /// RFC 3339 timestamp of when the scan completed.
    pub captured_at: String,
}
