// SPDX-License-Identifier: MIT
//! Time-bounded local cache of the axe-core audit script.
//!
//! A single well-known cache slot holds the latest `axe.min.js`. Within the
//! TTL the cached text is returned with zero network calls; once stale, the
//! upstream release feed is queried for the latest version tag and the
//! versioned CDN artifact is fetched and persisted. Concurrent refreshes are
//! tolerated — writes are idempotent per version tag, so last writer wins.
//! Writes go through a temp file + rename to avoid torn cache content.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::ScanError;

/// Maximum age before cached script content is considered stale (24 h).
pub const SCRIPT_TTL: Duration = Duration::from_secs(86_400);

/// Upstream timeout for both the release-metadata and CDN fetches.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Injected dependencies ───────────────────────────────────────────────────

/// Clock abstraction so freshness checks are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall-clock implementation used outside tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A cached script artifact and the instant it was last fetched.
#[derive(Debug, Clone)]
pub struct CachedScript {
    pub text: String,
    pub fetched_at: SystemTime,
}

/// Durable storage for the single cache slot.
pub trait ScriptStore: Send + Sync {
    /// Load the cached artifact, or `None` if the slot is empty.
    fn load(&self) -> io::Result<Option<CachedScript>>;
    /// Replace the slot's content, stamping it with the current time.
    fn store(&self, text: &str) -> io::Result<()>;
}

/// Filesystem store: one file whose mtime doubles as `fetched_at`.
pub struct FsScriptStore {
    path: PathBuf,
}

impl FsScriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScriptStore for FsScriptStore {
    fn load(&self) -> io::Result<Option<CachedScript>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let fetched_at = std::fs::metadata(&self.path)?.modified()?;
        Ok(Some(CachedScript { text, fetched_at }))
    }

    fn store(&self, text: &str) -> io::Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        // Write-to-temp-then-rename: a concurrent reader never sees a torn file.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        io::Write::write_all(&mut tmp, text.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Upstream release feed: resolves the latest version tag and fetches the
/// versioned script body.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn latest_tag(&self) -> Result<String, ScanError>;
    async fn fetch_script(&self, tag: &str) -> Result<String, ScanError>;
}

/// GitHub releases API + jsDelivr CDN, with explicit timeouts.
pub struct HttpReleaseFeed {
    client: reqwest::Client,
    release_api: String,
    cdn_template: String,
}

impl HttpReleaseFeed {
    /// Build the feed. The timeout bounds both upstream calls, so client
    /// construction fails rather than falling back to an unbounded one.
    pub fn new(
        release_api: String,
        cdn_template: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            release_api,
            cdn_template,
        })
    }
}

#[async_trait]
impl ReleaseFeed for HttpReleaseFeed {
    async fn latest_tag(&self) -> Result<String, ScanError> {
        let resp = self
            .client
            .get(&self.release_api)
            .header("User-Agent", concat!("axescan/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ScanError::UpstreamUnavailable(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ScanError::UpstreamUnavailable(e.to_string()))?;
        body.get("tag_name")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ScanError::UpstreamUnavailable("release feed carries no tag_name".to_string())
            })
    }

    async fn fetch_script(&self, tag: &str) -> Result<String, ScanError> {
        let url = self.cdn_template.replace("{tag}", tag);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ScanError::UpstreamUnavailable(e.to_string()))?;
        resp.text()
            .await
            .map_err(|e| ScanError::UpstreamUnavailable(e.to_string()))
    }
}

// ─── ScriptCache ─────────────────────────────────────────────────────────────

/// Guarantees a fresh copy of the audit script is available locally.
pub struct ScriptCache {
    clock: Arc<dyn Clock>,
    store: Arc<dyn ScriptStore>,
    feed: Arc<dyn ReleaseFeed>,
    ttl: Duration,
}

impl ScriptCache {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn ScriptStore>,
        feed: Arc<dyn ReleaseFeed>,
        ttl: Duration,
    ) -> Self {
        Self {
            clock,
            store,
            feed,
            ttl,
        }
    }

    /// Return the audit script text, refreshing from upstream when the
    /// cached copy is older than the TTL.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable` when a refresh is needed and the release feed
    /// or CDN fails; a scan never proceeds with a missing script.
    pub async fn ensure_script(&self) -> Result<String, ScanError> {
        if let Ok(Some(cached)) = self.store.load() {
            let age = self
                .clock
                .now()
                .duration_since(cached.fetched_at)
                .unwrap_or_default();
            if age < self.ttl {
                debug!(age_secs = age.as_secs(), "audit script cache hit");
                return Ok(cached.text);
            }
            debug!(age_secs = age.as_secs(), "audit script cache stale");
        }

        let tag = self.feed.latest_tag().await?;
        let text = self.feed.fetch_script(&tag).await?;
        if text.is_empty() {
            return Err(ScanError::UpstreamUnavailable(format!(
                "CDN returned an empty script body for tag {tag}"
            )));
        }
        self.store.store(&text)?;
        info!(tag = %tag, bytes = text.len(), "audit script cache refreshed");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeClock {
        now: Mutex<SystemTime>,
    }

    impl FakeClock {
        fn at(now: SystemTime) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
            })
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> SystemTime {
            *self.now.lock().unwrap()
        }
    }

    /// In-memory store stamping entries from the shared fake clock.
    struct MemoryStore {
        clock: Arc<FakeClock>,
        slot: Mutex<Option<CachedScript>>,
    }

    impl MemoryStore {
        fn new(clock: Arc<FakeClock>) -> Arc<Self> {
            Arc::new(Self {
                clock,
                slot: Mutex::new(None),
            })
        }

        fn fetched_at(&self) -> Option<SystemTime> {
            self.slot.lock().unwrap().as_ref().map(|c| c.fetched_at)
        }
    }

    impl ScriptStore for MemoryStore {
        fn load(&self) -> io::Result<Option<CachedScript>> {
            Ok(self.slot.lock().unwrap().clone())
        }

        fn store(&self, text: &str) -> io::Result<()> {
            *self.slot.lock().unwrap() = Some(CachedScript {
                text: text.to_string(),
                fetched_at: self.clock.now(),
            });
            Ok(())
        }
    }

    struct StubFeed {
        tag: &'static str,
        script: &'static str,
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubFeed {
        fn serving(tag: &'static str, script: &'static str) -> Arc<Self> {
            Arc::new(Self {
                tag,
                script,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                tag: "",
                script: "",
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl ReleaseFeed for StubFeed {
        async fn latest_tag(&self) -> Result<String, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScanError::UpstreamUnavailable("connect timeout".into()));
            }
            Ok(self.tag.to_string())
        }

        async fn fetch_script(&self, _tag: &str) -> Result<String, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScanError::UpstreamUnavailable("connect timeout".into()));
            }
            Ok(self.script.to_string())
        }
    }

    fn cache_with(
        clock: Arc<FakeClock>,
        store: Arc<MemoryStore>,
        feed: Arc<StubFeed>,
    ) -> ScriptCache {
        ScriptCache::new(clock, store, feed, SCRIPT_TTL)
    }

    #[tokio::test]
    async fn test_fresh_cache_makes_no_network_calls() {
        let clock = FakeClock::at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000));
        let store = MemoryStore::new(Arc::clone(&clock));
        store.store("window.axe = {};").unwrap();
        let feed = StubFeed::serving("v4.10.0", "new text");
        let cache = cache_with(clock.clone(), store, Arc::clone(&feed));

        clock.advance(Duration::from_secs(3600));
        let text = cache.ensure_script().await.unwrap();

        assert_eq!(text, "window.axe = {};");
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_cache_refreshes_and_restamps() {
        let clock = FakeClock::at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000));
        let store = MemoryStore::new(Arc::clone(&clock));
        store.store("old text").unwrap();
        let stamped_old = store.fetched_at().unwrap();
        let feed = StubFeed::serving("v4.10.0", "new text");
        let cache = cache_with(clock.clone(), Arc::clone(&store), Arc::clone(&feed));

        clock.advance(SCRIPT_TTL + Duration::from_secs(1));
        let text = cache.ensure_script().await.unwrap();

        assert_eq!(text, "new text");
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
        assert!(store.fetched_at().unwrap() > stamped_old);
    }

    #[tokio::test]
    async fn test_empty_slot_fetches() {
        let clock = FakeClock::at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000));
        let store = MemoryStore::new(Arc::clone(&clock));
        let feed = StubFeed::serving("v4.10.0", "fresh text");
        let cache = cache_with(clock, Arc::clone(&store), feed);

        assert_eq!(cache.ensure_script().await.unwrap(), "fresh text");
        assert!(store.fetched_at().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_fails_closed() {
        let clock = FakeClock::at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000));
        let store = MemoryStore::new(Arc::clone(&clock));
        let cache = cache_with(clock, store, StubFeed::unreachable());

        let err = cache.ensure_script().await.unwrap_err();
        assert!(matches!(err, ScanError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_cdn_body_is_upstream_error() {
        let clock = FakeClock::at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000));
        let store = MemoryStore::new(Arc::clone(&clock));
        let cache = cache_with(clock, Arc::clone(&store), StubFeed::serving("v4.10.0", ""));

        let err = cache.ensure_script().await.unwrap_err();
        assert!(matches!(err, ScanError::UpstreamUnavailable(_)));
        // Nothing was persisted.
        assert!(store.fetched_at().is_none());
    }

    #[test]
    fn test_http_feed_carries_its_timeout() {
        let feed = HttpReleaseFeed::new(
            "https://api.github.com/repos/dequelabs/axe-core/releases/latest".to_string(),
            "https://cdn.jsdelivr.net/npm/axe-core@{tag}/axe.min.js".to_string(),
            UPSTREAM_TIMEOUT,
        );
        assert!(feed.is_ok());
    }

    #[test]
    fn test_fs_store_roundtrip_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsScriptStore::new(dir.path().join("cache").join("axe.min.js"));

        assert!(store.load().unwrap().is_none());
        store.store("window.axe = {};").unwrap();
        let cached = store.load().unwrap().unwrap();
        assert_eq!(cached.text, "window.axe = {};");
    }

    #[test]
    fn test_fs_store_overwrite_is_atomic_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsScriptStore::new(dir.path().join("axe.min.js"));
        store.store("first").unwrap();
        store.store("second").unwrap();

        assert_eq!(store.load().unwrap().unwrap().text, "second");
        // No stray temp files left beside the slot.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
