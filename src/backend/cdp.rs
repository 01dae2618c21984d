// SPDX-License-Identifier: MIT
//! Scripted-page backend — browser processes scripted over CDP via
//! chromiumoxide.
//!
//! Unlike the attached-driver backend this one launches and owns the
//! browser process for the duration of the call. Every page interaction is
//! an await point, so concurrent scans interleave on the same scheduler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::Utc;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::Scanner;
use crate::cache::ScriptCache;
use crate::error::ScanError;
use crate::model::{parse_violations, Browser, Engine, ScanOptions, ScanResult, ScanTarget};

const AXE_PRESENT: &str = "typeof axe !== 'undefined'";
const AXE_RUN: &str = "async () => await axe.run()";

/// Browser binaries to probe on PATH, in preference order.
const CHROME_CANDIDATES: &[&str] = &[
    "chromium",
    "chrome",
    "google-chrome",
    "chromium-browser",
    "google-chrome-stable",
];

pub struct ScriptedPageBackend {
    cache: Arc<ScriptCache>,
}

impl ScriptedPageBackend {
    pub fn new(cache: Arc<ScriptCache>) -> Self {
        Self { cache }
    }

    async fn drive(
        &self,
        page: &Page,
        target: &ScanTarget,
        opts: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        let url = target.navigable_url();
        page.goto(url.as_str())
            .await
            .map_err(|e| ScanError::TargetUnreachable {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;

        let source = self.cache.ensure_script().await?;
        page.evaluate(source.as_str())
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;

        // Guards against the page not having finished loading before the
        // injection, or the evaluation silently no-opping.
        let injected = page
            .evaluate(AXE_PRESENT)
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?
            .into_value::<bool>()
            .unwrap_or(false);
        crate::backend::verify_injection(injected)?;

        let raw: Value = page
            .evaluate_function(AXE_RUN)
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?
            .into_value()
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;
        let violations = parse_violations(&raw);
        debug!(target = %url, count = violations.len(), "scripted-page audit complete");

        let png = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;

        Ok(ScanResult {
            target: target.identifier(),
            engine: Engine::Playwright,
            browser: opts.browser,
            violations,
            screenshot: BASE64.encode(png),
            captured_at: Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl Scanner for ScriptedPageBackend {
    async fn scan(
        &self,
        target: &ScanTarget,
        opts: &ScanOptions,
    ) -> Result<ScanResult, ScanError> {
        // Modern firefox speaks WebDriver BiDi, not CDP, so launching it
        // here would hang waiting for a DevTools handshake that never
        // comes. Fail fast with an honest error before spawning anything.
        if opts.browser == Browser::Firefox {
            return Err(ScanError::DriverFailure(
                "firefox is not supported by the CDP backend; use the selenium engine"
                    .to_string(),
            ));
        }

        let mut builder = BrowserConfig::builder().no_sandbox();
        if !opts.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = detect_chrome_executable() {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(ScanError::DriverFailure)?;

        let (mut browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| ScanError::DriverFailure(e.to_string()))?;
        // The handler pumps CDP messages for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let outcome = match browser.new_page("about:blank").await {
            Ok(page) => self.drive(&page, target, opts).await,
            Err(e) => Err(ScanError::DriverFailure(e.to_string())),
        };

        // Host process released on every exit path before the outcome
        // propagates.
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser process did not close cleanly");
        }
        let _ = browser.wait().await;
        handler_task.abort();

        outcome
    }
}

/// Probe PATH for the first available chromium-family binary, in the
/// manner of `which`. `None` leaves detection to the launcher.
fn detect_chrome_executable() -> Option<PathBuf> {
    let path_var = std::env::var("PATH").ok()?;
    for candidate in CHROME_CANDIDATES {
        for dir in path_var.split(':') {
            let full = Path::new(dir).join(candidate);
            if full.is_file() {
                debug!(binary = %full.display(), "browser binary detected");
                return Some(full);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FsScriptStore, ReleaseFeed, SystemClock, SCRIPT_TTL};
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_detect_chrome_executable_finds_binary_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("chromium");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let old_path = std::env::var("PATH").unwrap_or_default();
        std::env::set_var("PATH", dir.path());
        let found = detect_chrome_executable();
        std::env::set_var("PATH", old_path);

        assert_eq!(found, Some(bin));
    }

    struct NeverFeed;

    #[async_trait]
    impl ReleaseFeed for NeverFeed {
        async fn latest_tag(&self) -> Result<String, ScanError> {
            panic!("feed must not be consulted");
        }

        async fn fetch_script(&self, _tag: &str) -> Result<String, ScanError> {
            panic!("feed must not be consulted");
        }
    }

    #[tokio::test]
    async fn test_firefox_fails_fast_without_launching() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ScriptCache::new(
            Arc::new(SystemClock),
            Arc::new(FsScriptStore::new(dir.path().join("axe.min.js"))),
            Arc::new(NeverFeed),
            SCRIPT_TTL,
        ));
        let backend = ScriptedPageBackend::new(cache);
        let opts = ScanOptions {
            browser: Browser::Firefox,
            headless: true,
        };

        let err = backend
            .scan(&ScanTarget::RemoteUrl("https://example.com".to_string()), &opts)
            .await
            .unwrap_err();

        match err {
            ScanError::DriverFailure(msg) => assert!(msg.contains("selenium engine")),
            other => panic!("expected DriverFailure, got {other:?}"),
        }
    }
}
