//! Result types returned by sync operations.

use serde::{Deserialize, Serialize};

use crate::model::BreakingChange;

/// Outcome of a successful import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub added_count: usize,
    pub updated_count: usize,
    /// Always zero for MERGE.
    pub deleted_count: usize,
    pub breaks_detected: bool,
    pub breaking_changes: Vec<BreakingChange>,
}

impl ImportResult {
    /// Whether the import touched any endpoint.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.added_count > 0 || self.updated_count > 0 || self.deleted_count > 0
    }
}

/// Outcome of refreshing every contract that has an OpenAPI URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub total_apis: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<RefreshFailure>,
}

/// One contract that failed to refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshFailure {
    pub api_id: String,
    pub api_name: String,
    pub reason: String,
}
