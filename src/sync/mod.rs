//! OpenAPI synchronization.
//!
//! Keeps a contract's stored endpoints in step with the OpenAPI document
//! it publishes:
//!
//! - **Fetch**: download and normalize the document ([`SpecSource`])
//! - **Diff**: exact (method, path) comparison against the store
//! - **Classify**: flag removals as breaking changes
//! - **Apply**: MERGE (add + update) or REPLACE (also delete), all-or-nothing
//! - **Record**: append a [`SyncRun`](crate::model::SyncRun) to the ledger
//!
//! # Example
//!
//! ```ignore
//! use apireg::sync::{HttpSpecFetcher, ImportCoordinator};
//! use apireg::model::SyncMode;
//!
//! let fetcher = HttpSpecFetcher::new(timeout)?;
//! let coordinator = ImportCoordinator::new(db_path, fetcher).with_fetch_timeout(timeout);
//!
//! let diff = coordinator.preview_diff(&contract_id).await?;
//! let result = coordinator.import_openapi(&contract_id, SyncMode::Replace).await?;
//! ```

pub mod breaking;
pub mod clock;
pub mod coordinator;
pub mod diff;
pub mod fetch;
pub mod ledger;
pub mod types;

pub use breaking::{classify, REMOVED_ENDPOINT_DETAILS};
pub use clock::{Clock, FixedClock, SystemClock};
pub use coordinator::ImportCoordinator;
pub use diff::{diff, ChangedEndpoint, Diff};
pub use fetch::{parse_openapi, HttpSpecFetcher, SpecSource, DEFAULT_FETCH_TIMEOUT};
pub use types::{ImportResult, RefreshFailure, RefreshSummary};

/// Keep at most `max` characters of `text`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
