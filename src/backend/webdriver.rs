// SPDX-License-Identifier: MIT
//! Attached-driver backend — WebDriver sessions via fantoccini.
//!
//! Attaches to a live chromedriver/geckodriver endpoint rather than
//! launching a browser itself. The session is terminated on every exit
//! path; errors from the scan body propagate only after the close
//! completes.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::backend::Scanner;
use crate::cache::ScriptCache;
use crate::error::ScanError;
use crate::model::{parse_violations, Browser, Engine, ScanOptions, ScanResult, ScanTarget};

/// Async wrapper for `axe.run()` under WebDriver's execute-async protocol:
/// the driver appends a completion callback as the last script argument.
const AXE_RUN_ASYNC: &str =
    "var done = arguments[arguments.length - 1]; axe.run().then(function (r) { done(r); });";

const AXE_PRESENT: &str = "return typeof axe !== 'undefined';";

pub struct AttachedDriverBackend {
    endpoint: String,
    cache: Arc<ScriptCache>,
}

impl AttachedDriverBackend {
    pub fn new(endpoint: String, cache: Arc<ScriptCache>) -> Self {
        Self { endpoint, cache }
    }

    /// WebDriver capabilities for the requested browser; the headless flag
    /// toggles the browser's headless launch argument.
    fn capabilities(opts: &ScanOptions) -> Map<String, Value> {
        let mut caps = Map::new();
        match opts.browser {
            Browser::Chrome => {
                let mut args = vec!["--disable-gpu".to_string()];
                if opts.headless {
                    args.push("--headless=new".to_string());
                }
                caps.insert("browserName".to_string(), json!("chrome"));
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
            Browser::Firefox => {
                let mut args: Vec<String> = Vec::new();
                if opts.headless {
                    args.push("-headless".to_string());
                }
                caps.insert("browserName".to_string(), json!("firefox"));
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
        }
        caps
    }

    async fn drive(
        &self,
        client: &mut Client,
        target: &ScanTarget,
        opts: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        let url = target.navigable_url();
        client
            .goto(&url)
            .await
            .map_err(|e| ScanError::TargetUnreachable {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let source = self.cache.ensure_script().await?;
        client
            .execute(&source, vec![])
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;

        let present = client
            .execute(AXE_PRESENT, vec![])
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;
        crate::backend::verify_injection(present.as_bool().unwrap_or(false))?;

        let raw = client
            .execute_async(AXE_RUN_ASYNC, vec![])
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;
        let violations = parse_violations(&raw);
        debug!(target = %url, count = violations.len(), "webdriver audit complete");

        let png = client
            .screenshot()
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;

        Ok(ScanResult {
            target: target.identifier(),
            engine: Engine::Selenium,
            browser: opts.browser,
            violations,
            screenshot: BASE64.encode(png),
            captured_at: Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl Scanner for AttachedDriverBackend {
    async fn scan(
        &self,
        target: &ScanTarget,
        opts: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(Self::capabilities(opts));
        let mut client = builder
            .connect(&self.endpoint)
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;

        let outcome = self.drive(&mut client, target, opts).await;

        // Unconditional release: the session dies whether the scan
        // succeeded or not, and only then does the outcome propagate.
        if let Err(e) = client.close().await {
            warn!(error = %e, "webdriver session did not close cleanly");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_capabilities_headless_arg() {
        let caps = AttachedDriverBackend::capabilities(&ScanOptions {
            browser: Browser::Chrome,
            headless: true,
        });
        assert_eq!(caps["browserName"], json!("chrome"));
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn test_headed_firefox_has_no_headless_arg() {
        let caps = AttachedDriverBackend::capabilities(&ScanOptions {
            browser: Browser::Firefox,
            headless: false,
        });
        assert_eq!(caps["browserName"], json!("firefox"));
        let args = caps["moz:firefoxOptions"]["args"].as_array().unwrap();
        assert!(args.is_empty());
    }
}
