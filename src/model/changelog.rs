//! Changelog entries recorded against an API contract.

use serde::{Deserialize, Serialize};

/// Kind of change a changelog entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangelogType {
    Added,
    Changed,
    Deprecated,
    Removed,
    Fixed,
}

impl ChangelogType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Changed => "CHANGED",
            Self::Deprecated => "DEPRECATED",
            Self::Removed => "REMOVED",
            Self::Fixed => "FIXED",
        }
    }
}

impl std::str::FromStr for ChangelogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADDED" => Ok(Self::Added),
            "CHANGED" => Ok(Self::Changed),
            "DEPRECATED" => Ok(Self::Deprecated),
            "REMOVED" => Ok(Self::Removed),
            "FIXED" => Ok(Self::Fixed),
            _ => Err(format!("Unknown changelog type: {s}")),
        }
    }
}

/// One changelog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: ChangelogType,
    pub breaking: bool,
    pub summary: String,
    pub details: Option<String>,
    /// Release timestamp (Unix milliseconds)
    pub released_at: i64,
}
