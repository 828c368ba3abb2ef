//! Error types for apireg.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for apireg operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    PersistenceError,

    // Not Found (exit 3)
    ContractNotFound,
    EndpointNotFound,
    SyncRunNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidMode,

    // Conflict (exit 5)
    DuplicateContract,
    DuplicateEndpoint,
    ImportInProgress,

    // Sync (exit 6)
    FetchError,
    ParseError,
    NoSpecUrl,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::PersistenceError => "PERSISTENCE_ERROR",
            Self::ContractNotFound => "CONTRACT_NOT_FOUND",
            Self::EndpointNotFound => "ENDPOINT_NOT_FOUND",
            Self::SyncRunNotFound => "SYNC_RUN_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidMode => "INVALID_MODE",
            Self::DuplicateContract => "DUPLICATE_CONTRACT",
            Self::DuplicateEndpoint => "DUPLICATE_ENDPOINT",
            Self::ImportInProgress => "IMPORT_IN_PROGRESS",
            Self::FetchError => "FETCH_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::NoSpecUrl => "NO_SPEC_URL",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::PersistenceError => 2,
            Self::ContractNotFound | Self::EndpointNotFound | Self::SyncRunNotFound => 3,
            Self::InvalidArgument | Self::InvalidMode => 4,
            Self::DuplicateContract | Self::DuplicateEndpoint | Self::ImportInProgress => 5,
            Self::FetchError | Self::ParseError | Self::NoSpecUrl => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-issuing the same request may succeed.
    ///
    /// Nothing is retried automatically; this only tells the caller that
    /// re-triggering the operation is reasonable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FetchError
                | Self::ImportInProgress
                | Self::PersistenceError
                | Self::InvalidArgument
                | Self::InvalidMode
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in apireg operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `apireg init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("API contract not found: {id}")]
    ContractNotFound { id: String },

    #[error("Endpoint not found: {id}")]
    EndpointNotFound { id: String },

    #[error("Sync run not found: {id}")]
    SyncRunNotFound { id: String },

    #[error("API contract '{name}' already exists for team '{owner_team}'")]
    DuplicateContract { name: String, owner_team: String },

    #[error("Endpoint {method} {path} already exists for this API")]
    DuplicateEndpoint { method: String, path: String },

    #[error("An import is already running for API contract {contract_id}")]
    ImportInProgress { contract_id: String },

    #[error("API contract {contract_id} does not have an OpenAPI URL configured")]
    NoSpecUrl { contract_id: String },

    #[error("Failed to fetch OpenAPI spec from {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Failed to parse OpenAPI spec: {0}")]
    Parse(String),

    #[error("Invalid sync mode '{0}': expected MERGE or REPLACE")]
    InvalidMode(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::PersistenceError,
            Self::ContractNotFound { .. } => ErrorCode::ContractNotFound,
            Self::EndpointNotFound { .. } => ErrorCode::EndpointNotFound,
            Self::SyncRunNotFound { .. } => ErrorCode::SyncRunNotFound,
            Self::DuplicateContract { .. } => ErrorCode::DuplicateContract,
            Self::DuplicateEndpoint { .. } => ErrorCode::DuplicateEndpoint,
            Self::ImportInProgress { .. } => ErrorCode::ImportInProgress,
            Self::NoSpecUrl { .. } => ErrorCode::NoSpecUrl,
            Self::Fetch { .. } => ErrorCode::FetchError,
            Self::Parse(_) => ErrorCode::ParseError,
            Self::InvalidMode(_) => ErrorCode::InvalidMode,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `apireg init` to create the registry database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::ContractNotFound { id } => Some(format!(
                "No API contract with ID '{id}'. Use `apireg contract list` to see registered contracts."
            )),

            Self::SyncRunNotFound { .. } => {
                Some("Use `apireg sync runs <contract>` to list recorded sync runs.".to_string())
            }

            Self::NoSpecUrl { contract_id } => Some(format!(
                "Configure one with: apireg contract set-spec-url {contract_id} <url>"
            )),

            Self::ImportInProgress { .. } => {
                Some("Wait for the running import to finish, then re-run the command.".to_string())
            }

            Self::Fetch { .. } => Some(
                "Check that the URL is reachable over http(s). Raise the limit with --timeout if the server is slow."
                    .to_string(),
            ),

            Self::InvalidMode(_) => Some(
                "Valid modes: merge, replace. Synonyms: additive→merge, sync→merge, full→replace, overwrite→replace"
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("lifecycle") {
                    Some("Valid lifecycles: draft, active, deprecated".to_string())
                } else if msg.contains("method") {
                    Some("Valid methods: GET, POST, PUT, PATCH, DELETE".to_string())
                } else {
                    None
                }
            }

            Self::EndpointNotFound { .. }
            | Self::DuplicateContract { .. }
            | Self::DuplicateEndpoint { .. }
            | Self::Parse(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
