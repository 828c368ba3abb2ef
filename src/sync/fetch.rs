//! OpenAPI document retrieval and normalization.
//!
//! A [`SpecSource`] turns a URL into the list of operations the document
//! declares. [`HttpSpecFetcher`] is the production source; tests plug in
//! stubs.

use std::time::Duration;

use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::model::{HttpMethod, NormalizedOperation};

/// Default limit for a single document fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Media types sent in the `Accept` header.
const ACCEPTED_MEDIA_TYPES: &str = "application/json, application/yaml";

/// Path-item keys that name operations the registry does not track.
const UNTRACKED_METHODS: [&str; 3] = ["head", "options", "trace"];

/// Anything that can produce the normalized operations of a remote document.
pub trait SpecSource: Send + Sync {
    /// Fetch the document at `url` and normalize its operations.
    ///
    /// Fails with `Fetch` when the document cannot be retrieved and with
    /// `Parse` when it is not a usable OpenAPI or Swagger document.
    fn fetch(&self, url: &str) -> impl std::future::Future<Output = Result<Vec<NormalizedOperation>>> + Send;
}

/// Fetches OpenAPI documents over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSpecFetcher {
    client: reqwest::Client,
}

impl HttpSpecFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("apireg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Retrieve the raw document body.
    async fn fetch_document(&self, url: &str) -> Result<String> {
        let parsed = reqwest::Url::parse(url).map_err(|e| fetch_error(url, format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(fetch_error(
                url,
                format!("unsupported scheme '{}', expected http or https", parsed.scheme()),
            ));
        }

        debug!(url, "Requesting OpenAPI document");
        let response = self
            .client
            .get(parsed)
            .header(ACCEPT, ACCEPTED_MEDIA_TYPES)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    fetch_error(url, "request timed out".to_string())
                } else {
                    fetch_error(url, e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(url, format!("server responded with {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| fetch_error(url, format!("failed to read response body: {e}")))
    }
}

impl SpecSource for HttpSpecFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<NormalizedOperation>> {
        let body = self.fetch_document(url).await?;
        parse_openapi(&body)
    }
}

fn fetch_error(url: &str, message: String) -> Error {
    Error::Fetch {
        url: url.to_string(),
        message,
    }
}

/// Parse an OpenAPI 3.x or Swagger 2.0 document (JSON or YAML).
///
/// Operations come out in document order: paths as they appear, and within
/// a path GET, POST, PUT, PATCH, DELETE. A document without `paths`
/// declares no operations.
///
/// # Errors
///
/// Returns `Parse` if the body is not a mapping, carries no `openapi` or
/// `swagger` version field, or has a malformed `paths` section.
pub fn parse_openapi(body: &str) -> Result<Vec<NormalizedOperation>> {
    let document: Value = if body.trim_start().starts_with('{') {
        serde_json::from_str(body).map_err(|e| Error::Parse(format!("invalid JSON: {e}")))?
    } else {
        serde_yaml::from_str(body).map_err(|e| Error::Parse(format!("invalid YAML: {e}")))?
    };

    let Value::Object(root) = document else {
        return Err(Error::Parse("document root must be a mapping".to_string()));
    };

    // Unquoted YAML versions such as `openapi: 3.0` arrive as numbers
    let version = root
        .get("openapi")
        .or_else(|| root.get("swagger"))
        .filter(|v| v.is_string() || v.is_number())
        .ok_or_else(|| Error::Parse("missing 'openapi' or 'swagger' version field".to_string()))?;
    debug!(%version, "Parsing OpenAPI document");

    let paths = match root.get("paths") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(paths)) => paths,
        Some(_) => return Err(Error::Parse("'paths' must be a mapping".to_string())),
    };

    let mut operations = Vec::new();
    for (path, item) in paths {
        let item = match item {
            Value::Object(item) => item,
            Value::Null => continue,
            _ => {
                return Err(Error::Parse(format!(
                    "path item for '{path}' must be a mapping"
                )))
            }
        };

        for method in HttpMethod::ALL {
            let Some(operation) = item.get(method.openapi_key()) else {
                continue;
            };
            let Value::Object(operation) = operation else {
                return Err(Error::Parse(format!(
                    "operation {method} {path} must be a mapping"
                )));
            };
            operations.push(NormalizedOperation {
                method,
                path: path.clone(),
                description: describe(operation),
                deprecated: operation.get("deprecated").and_then(Value::as_bool) == Some(true),
            });
        }

        for key in UNTRACKED_METHODS {
            if item.contains_key(key) {
                trace!(path = %path, method = key, "Skipping untracked operation");
            }
        }
    }

    Ok(operations)
}

/// Summary if non-blank, else description if non-blank.
fn describe(operation: &Map<String, Value>) -> Option<String> {
    ["summary", "description"].into_iter().find_map(|field| {
        operation
            .get(field)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
    })
}
