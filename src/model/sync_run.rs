//! Sync run records and the breaking changes attached to them.
//!
//! A sync run is written once per import attempt and never touched again.

use serde::{Deserialize, Serialize};

use super::HttpMethod;

/// How an import applies a diff to the stored endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncMode {
    /// Add new operations and update changed ones. Never deletes.
    #[default]
    Merge,
    /// Everything `Merge` does, plus delete endpoints missing from the document.
    Replace,
}

impl SyncMode {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "MERGE",
            Self::Replace => "REPLACE",
        }
    }

    /// Whether this mode deletes endpoints absent from the remote document.
    #[must_use]
    pub const fn deletes_removed(&self) -> bool {
        matches!(self, Self::Replace)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MERGE" => Ok(Self::Merge),
            "REPLACE" => Ok(Self::Replace),
            _ => Err(format!("Unknown sync mode: {s}")),
        }
    }
}

/// Outcome of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Success,
    Failed,
}

impl SyncStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown sync status: {s}")),
        }
    }
}

/// Kinds of backward-incompatible change.
///
/// `PathChanged` and `MethodChanged` are never produced by the exact-key
/// diff; they stay in the model so stored runs and consumers keep a stable
/// vocabulary for a rename-aware strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakingChangeType {
    RemovedEndpoint,
    PathChanged,
    MethodChanged,
}

impl BreakingChangeType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RemovedEndpoint => "REMOVED_ENDPOINT",
            Self::PathChanged => "PATH_CHANGED",
            Self::MethodChanged => "METHOD_CHANGED",
        }
    }
}

impl std::str::FromStr for BreakingChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REMOVED_ENDPOINT" => Ok(Self::RemovedEndpoint),
            "PATH_CHANGED" => Ok(Self::PathChanged),
            "METHOD_CHANGED" => Ok(Self::MethodChanged),
            _ => Err(format!("Unknown breaking change type: {s}")),
        }
    }
}

/// One backward-incompatible change detected during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingChange {
    #[serde(rename = "type")]
    pub change_type: BreakingChangeType,
    pub method: HttpMethod,
    pub path: String,
    pub details: Option<String>,
}

/// An immutable record of one import attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: String,
    pub contract_id: String,
    /// When the run was recorded (Unix milliseconds)
    pub run_at: i64,
    pub status: SyncStatus,
    pub mode: SyncMode,
    pub added_count: usize,
    pub updated_count: usize,
    pub deleted_count: usize,
    pub breaks_detected: bool,
    pub error_message: Option<String>,
    pub breaking_changes: Vec<BreakingChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tokens() {
        assert_eq!("MERGE".parse::<SyncMode>().unwrap(), SyncMode::Merge);
        assert_eq!("replace".parse::<SyncMode>().unwrap(), SyncMode::Replace);
        assert!("upsert".parse::<SyncMode>().is_err());
        assert_eq!(serde_json::to_value(SyncMode::Replace).unwrap(), "REPLACE");
    }

    #[test]
    fn test_only_replace_deletes() {
        assert!(!SyncMode::Merge.deletes_removed());
        assert!(SyncMode::Replace.deletes_removed());
    }

    #[test]
    fn test_breaking_change_serializes_type_field() {
        let change = BreakingChange {
            change_type: BreakingChangeType::RemovedEndpoint,
            method: HttpMethod::Delete,
            path: "/users/{id}".into(),
            details: None,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "REMOVED_ENDPOINT");
        assert_eq!(json["method"], "DELETE");
    }
}
