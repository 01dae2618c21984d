// SPDX-License-Identifier: MIT
//! Reduction of a scan result's violation list into a display-ready
//! summary. Pure projection — no side effects, no failures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One summarised violation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationSummary {
    pub id: String,
    pub impact: String,
    pub description: String,
    pub affected_node_count: usize,
}

/// Project the `violations` field of a serialized scan result.
///
/// Accepts both the typed [`crate::model::Violation`] shape and raw
/// `axe.run()` rows (which carry a `nodes` array instead of a count).
/// Missing or malformed input yields the empty sentinel, never an error.
pub fn summarize(result: &Value) -> Vec<ViolationSummary> {
    let Some(rows) = result.get("violations").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| ViolationSummary {
            id: row
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            impact: row
                .get("impact")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            description: row
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            affected_node_count: row
                .get("affected_node_count")
                .and_then(Value::as_u64)
                .map(|n| n as usize)
                .or_else(|| row.get("nodes").and_then(Value::as_array).map(Vec::len))
                .unwrap_or(0),
        })
        .collect()
}
