// SPDX-License-Identifier: MIT
//! Batch scanning with per-target failure isolation.
//!
//! Every target gets exactly one entry in the result; a failing scan is
//! recorded as that entry's error and never aborts the rest of the batch.
//! Entry order mirrors input order, lookup is by target identifier.

use futures_util::future::join_all;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::backend::Scanner;
use crate::error::ScanError;
use crate::model::{Engine, ScanOptions, ScanResult, ScanTarget};

/// One entry of a batch result: a completed scan or the error that replaced
/// it.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TargetOutcome {
    Success(ScanResult),
    Failure { error: String, code: &'static str },
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetOutcome::Success(_))
    }
}

impl From<Result<ScanResult, ScanError>> for TargetOutcome {
    fn from(res: Result<ScanResult, ScanError>) -> Self {
        match res {
            Ok(result) => TargetOutcome::Success(result),
            Err(e) => TargetOutcome::Failure {
                code: e.code(),
                error: e.to_string(),
            },
        }
    }
}

/// Complete mapping from target identifier to outcome. Never exposed
/// partially filled: `run` returns it only once every target has an entry.
#[derive(Debug, Default)]
pub struct BatchResult {
    entries: Vec<(String, TargetOutcome)>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, identifier: &str) -> Option<&TargetOutcome> {
        self.entries
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, TargetOutcome)> {
        self.entries.iter()
    }
}

impl Serialize for BatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, outcome) in &self.entries {
            map.serialize_entry(id, outcome)?;
        }
        map.end()
    }
}

/// Execute a scan across many URL targets.
///
/// The scheduling choice follows the backend: scripted-page scans run
/// concurrently (each owns its own browser process), attached-driver scans
/// run sequentially against the single live WebDriver endpoint. Isolation
/// holds either way.
pub async fn run(
    scanner: &dyn Scanner,
    engine: Engine,
    targets: &[String],
    opts: &ScanOptions,
) -> BatchResult {
    let outcomes: Vec<TargetOutcome> = match engine {
        Engine::Playwright => {
            join_all(targets.iter().map(|t| scan_one(scanner, t, opts))).await
        }
        Engine::Selenium => {
            let mut outcomes = Vec::with_capacity(targets.len());
            for target in targets {
                outcomes.push(scan_one(scanner, target, opts).await);
            }
            outcomes
        }
    };

    BatchResult {
        entries: targets.iter().cloned().zip(outcomes).collect(),
    }
}

async fn scan_one(scanner: &dyn Scanner, url: &str, opts: &ScanOptions) -> TargetOutcome {
    let target = ScanTarget::RemoteUrl(url.to_string());
    let outcome = scanner.scan(&target, opts).await;
    if let Err(e) = &outcome {
        warn!(target = %url, error = %e, "batch target failed");
    }
    outcome.into()
}
