//! Data models for apireg.
//!
//! This module contains all domain models:
//! - ApiContract (with Lifecycle)
//! - Endpoint and NormalizedOperation (with HttpMethod)
//! - ChangelogEntry
//! - SyncRun and BreakingChange (with SyncMode, SyncStatus)

pub mod changelog;
pub mod contract;
pub mod endpoint;
pub mod sync_run;

pub use changelog::{ChangelogEntry, ChangelogType};
pub use contract::{ApiContract, Lifecycle};
pub use endpoint::{Endpoint, HttpMethod, NormalizedOperation};
pub use sync_run::{BreakingChange, BreakingChangeType, SyncMode, SyncRun, SyncStatus};

/// Generate a prefixed short identifier (e.g. `api_1a2b3c4d5e6f`).
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}
