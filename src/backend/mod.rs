// SPDX-License-Identifier: MIT
//! Scan backends.
//!
//! Two interchangeable strategies drive a browser and run the audit engine:
//! an attached-driver backend speaking WebDriver to a live
//! chromedriver/geckodriver endpoint, and a scripted-page backend that
//! launches its own browser process and scripts it over CDP. Callers depend
//! only on the [`Scanner`] trait, never on a concrete session type.

pub mod cdp;
pub mod webdriver;

use async_trait::async_trait;

use crate::error::ScanError;
use crate::model::{ScanOptions, ScanResult, ScanTarget};

pub use cdp::ScriptedPageBackend;
pub use webdriver::AttachedDriverBackend;

/// One capability: given a navigable target and browser choice, produce a
/// [`ScanResult`]. The browser session is owned exclusively by the call and
/// released on every exit path.
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, target: &ScanTarget, opts: &ScanOptions)
        -> Result<ScanResult, ScanError>;
}

/// Turn the in-page presence check into the injection verdict. A negative
/// check means the engine never registered (page not loaded yet, or the
/// evaluation silently no-opped) and the scan must not produce a partial
/// result.
pub(crate) fn verify_injection(present: bool) -> Result<(), ScanError> {
    if present {
        Ok(())
    } else {
        Err(ScanError::InjectionFailed)
    }
}
