//! Endpoint model.
//!
//! An endpoint is one operation a contract declares. Within a contract the
//! pair (method, path) is the natural key: it is unique among stored
//! endpoints and is the only thing the diff engine matches on.

use serde::{Deserialize, Serialize};

/// HTTP methods the registry tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// All tracked methods, in the order operations are read from a path item.
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Patch, Self::Delete];

    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Key used for this method inside an OpenAPI path item.
    #[must_use]
    pub const fn openapi_key(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Unknown HTTP method: {s}")),
        }
    }
}

/// A stored endpoint belonging to one API contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    pub method: HttpMethod,
    pub path: String,
    pub description: Option<String>,
    pub deprecated: bool,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
}

impl Endpoint {
    /// Natural key of this endpoint.
    #[must_use]
    pub fn key(&self) -> (HttpMethod, &str) {
        (self.method, self.path.as_str())
    }
}

/// One operation read from a remote OpenAPI document.
///
/// Same shape as [`Endpoint`] without the identity and timestamp the
/// registry assigns on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOperation {
    pub method: HttpMethod,
    pub path: String,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

impl NormalizedOperation {
    /// Build an operation with no description that is not deprecated.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            description: None,
            deprecated: false,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the operation deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Natural key of this operation.
    #[must_use]
    pub fn key(&self) -> (HttpMethod, &str) {
        (self.method, self.path.as_str())
    }
}
