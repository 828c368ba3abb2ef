//! API contract model.
//!
//! A contract is one registered API: its identity (name + owner team),
//! where it lives, what version it is at, and optionally where its
//! OpenAPI document can be fetched from.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    #[default]
    Draft,
    Active,
    Deprecated,
}

impl Lifecycle {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Deprecated => "DEPRECATED",
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Lifecycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "DEPRECATED" => Ok(Self::Deprecated),
            _ => Err(format!("Unknown lifecycle: {s}")),
        }
    }
}

/// A registered API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiContract {
    /// Unique identifier (`api_` prefix)
    pub id: String,

    pub name: String,

    pub base_url: String,

    pub version: String,

    /// Team that owns the API; (name, owner_team) is unique
    pub owner_team: String,

    pub lifecycle: Lifecycle,

    /// Where the OpenAPI document is published, if anywhere
    pub open_api_url: Option<String>,

    pub description: Option<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl ApiContract {
    /// Create a new draft contract.
    pub fn new(name: String, base_url: String, version: String, owner_team: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: super::new_id("api"),
            name,
            base_url,
            version,
            owner_team,
            lifecycle: Lifecycle::default(),
            open_api_url: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The configured OpenAPI URL, treating blank values as absent.
    #[must_use]
    pub fn spec_url(&self) -> Option<&str> {
        self.open_api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_contract() {
        let contract = ApiContract::new(
            "Users".to_string(),
            "https://users.internal".to_string(),
            "1.0.0".to_string(),
            "identity".to_string(),
        );

        assert!(contract.id.starts_with("api_"));
        assert_eq!(contract.lifecycle, Lifecycle::Draft);
        assert_eq!(contract.created_at, contract.updated_at);
    }

    #[test]
    fn test_blank_spec_url_is_absent() {
        let mut contract = ApiContract::new("A".into(), "http://a".into(), "1".into(), "t".into());
        assert_eq!(contract.spec_url(), None);

        contract.open_api_url = Some("   ".into());
        assert_eq!(contract.spec_url(), None);

        contract.open_api_url = Some(" http://a/openapi.json ".into());
        assert_eq!(contract.spec_url(), Some("http://a/openapi.json"));
    }
}
