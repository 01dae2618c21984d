// SPDX-License-Identifier: MIT
//! axescan — accessibility scan orchestration.
//!
//! Drives a browser against a URL or raw HTML, injects the axe-core rule
//! engine, and returns structured violations plus a screenshot. Consumed by
//! three thin adapters: the CLI in `main.rs`, the REST API in [`rest`], and
//! the MCP tool server in [`mcp`].

pub mod backend;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod mcp;
pub mod model;
pub mod report;
pub mod rest;
pub mod summary;
pub mod target;

use std::sync::Arc;
use std::time::Duration;

use backend::{AttachedDriverBackend, Scanner, ScriptedPageBackend};
use cache::{FsScriptStore, HttpReleaseFeed, ScriptCache, SystemClock};
use config::ScanConfig;
use model::Engine;

/// Shared application state passed to every adapter.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ScanConfig>,
    pub cache: Arc<ScriptCache>,
    webdriver: Arc<AttachedDriverBackend>,
    scripted: Arc<ScriptedPageBackend>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: ScanConfig) -> anyhow::Result<Self> {
        let feed = HttpReleaseFeed::new(
            config.upstream.release_api.clone(),
            config.upstream.cdn_template.clone(),
            Duration::from_secs(config.upstream.timeout_secs),
        )?;
        let cache = Arc::new(ScriptCache::new(
            Arc::new(SystemClock),
            Arc::new(FsScriptStore::new(config.cache.script_path())),
            Arc::new(feed),
            Duration::from_secs(config.cache.ttl_secs),
        ));
        let webdriver = Arc::new(AttachedDriverBackend::new(
            config.webdriver.url.clone(),
            Arc::clone(&cache),
        ));
        let scripted = Arc::new(ScriptedPageBackend::new(Arc::clone(&cache)));
        Ok(Self {
            config: Arc::new(config),
            cache,
            webdriver,
            scripted,
            started_at: std::time::Instant::now(),
        })
    }

    /// The backend implementing the requested engine.
    pub fn scanner(&self, engine: Engine) -> Arc<dyn Scanner> {
        match engine {
            Engine::Selenium => Arc::clone(&self.webdriver) as Arc<dyn Scanner>,
            Engine::Playwright => Arc::clone(&self.scripted) as Arc<dyn Scanner>,
        }
    }
}
