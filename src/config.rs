// SPDX-License-Identifier: MIT
//! Scanner configuration (`config.toml`).
//!
//! Every section and field has a default so a missing file or a sparse one
//! is always valid.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_RELEASE_API: &str = "https://api.github.com/repos/dequelabs/axe-core/releases/latest";
const DEFAULT_CDN_TEMPLATE: &str = "https://cdn.jsdelivr.net/npm/axe-core@{tag}/axe.min.js";
const DEFAULT_WEBDRIVER_URL: &str = "http://127.0.0.1:4444";

fn default_cache_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".axescan"))
        .unwrap_or_else(|| std::env::temp_dir().join("axescan"))
}

fn default_ttl_secs() -> u64 {
    86_400
}

fn default_release_api() -> String {
    DEFAULT_RELEASE_API.to_string()
}

fn default_cdn_template() -> String {
    DEFAULT_CDN_TEMPLATE.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_webdriver_url() -> String {
    DEFAULT_WEBDRIVER_URL.to_string()
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_headless() -> bool {
    true
}

// ─── Sections ────────────────────────────────────────────────────────────────

/// Script cache settings (`[cache]`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the cached `axe.min.js`.
    pub dir: PathBuf,
    /// Maximum cache age in seconds before a refresh (default: 24 h).
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Well-known cache slot for the audit script.
    pub fn script_path(&self) -> PathBuf {
        self.dir.join("axe.min.js")
    }
}

/// Upstream release feed settings (`[upstream]`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Release-metadata endpoint queried for the latest version tag.
    pub release_api: String,
    /// CDN URL template; `{tag}` is replaced with the release tag.
    pub cdn_template: String,
    /// Timeout applied to both upstream calls (default: 10 s).
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            release_api: default_release_api(),
            cdn_template: default_cdn_template(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Attached-driver settings (`[webdriver]`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebdriverConfig {
    /// Live WebDriver endpoint (chromedriver/geckodriver).
    pub url: String,
}

impl Default for WebdriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
        }
    }
}

/// Scan defaults (`[scan]`), overridable per request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanDefaults {
    pub browser: String,
    pub headless: bool,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            browser: default_browser(),
            headless: default_headless(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub webdriver: WebdriverConfig,
    pub scan: ScanDefaults,
}

impl ScanConfig {
    /// Load from `path`, or defaults when no path is given or the file does
    /// not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.upstream.timeout_secs, 10);
        assert!(config.upstream.release_api.contains("dequelabs/axe-core"));
        assert!(config.upstream.cdn_template.contains("{tag}"));
        assert_eq!(config.scan.browser, "chrome");
        assert!(config.scan.headless);
        assert!(config.cache.script_path().ends_with("axe.min.js"));
    }

    #[test]
    fn test_sparse_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[webdriver]\nurl = \"http://10.0.0.5:4444\"\n").unwrap();

        let config = ScanConfig::load(Some(&path)).unwrap();
        assert_eq!(config.webdriver.url, "http://10.0.0.5:4444");
        assert_eq!(config.cache.ttl_secs, 86_400);
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let config = ScanConfig::load(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.upstream.timeout_secs, 10);
    }
}
