//! Import coordination: fetch, diff, classify, apply, record.
//!
//! Each import walks `fetching -> diffing -> applying -> success | failed`.
//! Failures after the contract lookup always leave a FAILED run in the
//! ledger and never a partially applied endpoint set.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::breaking::classify;
use super::clock::{Clock, SystemClock};
use super::diff::{diff, Diff};
use super::fetch::{SpecSource, DEFAULT_FETCH_TIMEOUT};
use super::ledger::{self, insert_sync_run};
use super::types::{ImportResult, RefreshFailure, RefreshSummary};
use crate::error::{Error, Result};
use crate::model::{new_id, ChangelogEntry, ChangelogType, NormalizedOperation, SyncMode, SyncRun};
use crate::storage::events::EventType;
use crate::storage::sqlite::{
    create_endpoint, delete_endpoint, insert_changelog_entry, list_endpoints, update_endpoint,
};
use crate::storage::SqliteStorage;

/// Longest failure reason kept in a refresh summary.
pub const MAX_REFRESH_REASON_LEN: usize = 200;

/// Longest details text on an automatic changelog entry.
pub const MAX_CHANGELOG_DETAILS_LEN: usize = 1000;

/// Orchestrates OpenAPI imports against the registry database.
///
/// Cheap to share behind an `Arc`. Every operation opens its own
/// connection, so previews and listings read the last committed state
/// while an import is running.
pub struct ImportCoordinator<S, C = SystemClock> {
    db_path: PathBuf,
    source: S,
    clock: C,
    fetch_timeout: Duration,
    actor: String,
    in_flight: Mutex<HashSet<String>>,
}

impl<S: SpecSource> ImportCoordinator<S> {
    /// Create a coordinator over the database at `db_path`.
    pub fn new(db_path: impl Into<PathBuf>, source: S) -> Self {
        Self {
            db_path: db_path.into(),
            source,
            clock: SystemClock,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            actor: "apireg".to_string(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }
}

impl<S: SpecSource, C: Clock> ImportCoordinator<S, C> {
    /// Swap the time source used for `runAt` and changelog timestamps.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ImportCoordinator<S, C2> {
        ImportCoordinator {
            db_path: self.db_path,
            source: self.source,
            clock,
            fetch_timeout: self.fetch_timeout,
            actor: self.actor,
            in_flight: self.in_flight,
        }
    }

    /// Bound every fetch by `timeout`.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Actor recorded on audit events.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<SqliteStorage> {
        SqliteStorage::open(&self.db_path)
    }

    /// Compute what an import would do without touching the store or ledger.
    ///
    /// # Errors
    ///
    /// Returns `ContractNotFound`, `NoSpecUrl`, `Fetch` or `Parse`.
    pub async fn preview_diff(&self, contract_id: &str) -> Result<Diff> {
        let url = self.spec_url(contract_id)?;
        let operations = self.fetch(&url).await?;

        let storage = self.open()?;
        let current = storage.list_endpoints(contract_id)?;
        let diff = diff(&current, &operations);
        debug!(
            contract_id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            changed = diff.changed.len(),
            "Previewed diff"
        );
        Ok(diff)
    }

    /// Synchronize a contract's endpoints with its OpenAPI document.
    ///
    /// # Errors
    ///
    /// Returns `ImportInProgress` if another import for the contract is
    /// running, `ContractNotFound` for an unknown contract, and otherwise
    /// the error that ended the run (`NoSpecUrl`, `Fetch`, `Parse`, or a
    /// persistence error). Every error after the contract lookup has a
    /// FAILED run recorded for it.
    pub async fn import_openapi(&self, contract_id: &str, mode: SyncMode) -> Result<ImportResult> {
        let _guard = ImportGuard::acquire(&self.in_flight, contract_id)?;

        let url = match self.spec_url(contract_id) {
            Ok(url) => url,
            Err(err @ Error::NoSpecUrl { .. }) => {
                warn!(contract_id, "Import requested without an OpenAPI URL");
                self.record_failure(contract_id, mode, &err);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        info!(contract_id, %mode, url = %url, "Fetching OpenAPI spec");
        let operations = match self.fetch(&url).await {
            Ok(operations) => operations,
            Err(err) => {
                warn!(contract_id, %mode, error = %err, "Fetch failed");
                self.record_failure(contract_id, mode, &err);
                return Err(err);
            }
        };

        // Nothing below awaits: once applying starts it runs to commit or rollback
        match self.apply(contract_id, mode, &operations) {
            Ok(result) => {
                info!(
                    contract_id,
                    %mode,
                    added = result.added_count,
                    updated = result.updated_count,
                    deleted = result.deleted_count,
                    breaks_detected = result.breaks_detected,
                    "Import succeeded"
                );
                Ok(result)
            }
            Err(err) => {
                error!(contract_id, %mode, error = %err, "Apply failed, rolled back");
                self.record_failure(contract_id, mode, &err);
                Err(err)
            }
        }
    }

    /// Import every contract that has an OpenAPI URL, one after another.
    ///
    /// Per-contract failures are collected rather than aborting the batch.
    ///
    /// # Errors
    ///
    /// Returns an error only if the contract list cannot be read.
    pub async fn refresh_all(&self, mode: SyncMode) -> Result<RefreshSummary> {
        let contracts: Vec<_> = self
            .open()?
            .list_contracts()?
            .into_iter()
            .filter(|c| c.spec_url().is_some())
            .collect();

        info!(count = contracts.len(), %mode, "Refreshing contracts");
        let mut summary = RefreshSummary {
            total_apis: contracts.len(),
            ..RefreshSummary::default()
        };

        for contract in contracts {
            match self.import_openapi(&contract.id, mode).await {
                Ok(_) => summary.succeeded += 1,
                Err(err) => {
                    summary.failed += 1;
                    summary.failures.push(RefreshFailure {
                        api_id: contract.id,
                        api_name: contract.name,
                        reason: super::truncate(&err.to_string(), MAX_REFRESH_REASON_LEN),
                    });
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Refresh complete"
        );
        Ok(summary)
    }

    /// Ledger entries for a contract, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    pub fn list_sync_runs(&self, contract_id: &str) -> Result<Vec<SyncRun>> {
        ledger::list_sync_runs(self.open()?.conn(), contract_id)
    }

    /// One ledger entry by ID.
    ///
    /// # Errors
    ///
    /// Returns `SyncRunNotFound` if no run has this ID.
    pub fn get_sync_run(&self, id: &str) -> Result<SyncRun> {
        ledger::get_sync_run(self.open()?.conn(), id)?.ok_or_else(|| Error::SyncRunNotFound {
            id: id.to_string(),
        })
    }

    fn spec_url(&self, contract_id: &str) -> Result<String> {
        self.open()?
            .get_spec_url(contract_id)?
            .ok_or_else(|| Error::NoSpecUrl {
                contract_id: contract_id.to_string(),
            })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<NormalizedOperation>> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Fetch {
                url: url.to_string(),
                message: format!("timed out after {:?}", self.fetch_timeout),
            }),
        }
    }

    /// Diff, classify and apply in one IMMEDIATE transaction, together with
    /// the SUCCESS run and the automatic changelog entry.
    fn apply(
        &self,
        contract_id: &str,
        mode: SyncMode,
        operations: &[NormalizedOperation],
    ) -> Result<ImportResult> {
        let mut storage = self.open()?;
        let now = self.clock.now_millis();

        storage.mutate("import_openapi", &self.actor, |tx, ctx| {
            let current = list_endpoints(tx, contract_id)?;
            let diff = diff(&current, operations);
            let breaking_changes = classify(&diff);
            debug!(
                contract_id,
                added = diff.added.len(),
                removed = diff.removed.len(),
                changed = diff.changed.len(),
                breaking = breaking_changes.len(),
                "Applying diff"
            );

            for operation in &diff.added {
                create_endpoint(tx, ctx, contract_id, operation, now)?;
            }
            for change in &diff.changed {
                update_endpoint(
                    tx,
                    ctx,
                    contract_id,
                    &change.current.id,
                    change.proposed.description.as_deref(),
                    change.proposed.deprecated,
                )?;
            }
            let mut deleted_count = 0;
            if mode.deletes_removed() {
                for endpoint in &diff.removed {
                    delete_endpoint(tx, ctx, contract_id, &endpoint.id)?;
                    deleted_count += 1;
                }
            }

            let result = ImportResult {
                added_count: diff.added.len(),
                updated_count: diff.changed.len(),
                deleted_count,
                breaks_detected: !breaking_changes.is_empty(),
                breaking_changes,
            };

            let run = SyncRun::succeeded(
                contract_id,
                mode,
                now,
                (result.added_count, result.updated_count, result.deleted_count),
                result.breaking_changes.clone(),
            );
            insert_sync_run(tx, &run)?;
            ctx.record_event("sync_run", &run.id, EventType::SyncRunRecorded);

            if result.has_changes() {
                insert_changelog_entry(tx, ctx, contract_id, &sync_changelog_entry(&result, now))?;
            }

            Ok(result)
        })
    }

    /// Append a FAILED run. A ledger write that itself fails is logged and
    /// the original error still goes back to the caller.
    fn record_failure(&self, contract_id: &str, mode: SyncMode, err: &Error) {
        let run = SyncRun::failed(contract_id, mode, self.clock.now_millis(), &err.to_string());
        let recorded = self.open().and_then(|mut storage| {
            storage.mutate("record_sync_failure", &self.actor, |tx, ctx| {
                insert_sync_run(tx, &run)?;
                ctx.record_event("sync_run", &run.id, EventType::SyncRunRecorded);
                Ok(())
            })
        });

        if let Err(ledger_err) = recorded {
            error!(contract_id, error = %ledger_err, "Failed to record failed sync run");
        }
    }
}

/// The changelog entry written after an import that changed something.
fn sync_changelog_entry(result: &ImportResult, released_at: i64) -> ChangelogEntry {
    let counts = [
        ('+', "Added", result.added_count),
        ('~', "Updated", result.updated_count),
        ('-', "Removed", result.deleted_count),
    ];

    let summary_parts: Vec<String> = counts
        .iter()
        .filter(|(_, _, n)| *n > 0)
        .map(|(sign, _, n)| format!("{sign}{n}"))
        .collect();

    let details: String = counts
        .iter()
        .filter(|(_, _, n)| *n > 0)
        .map(|(_, label, n)| format!("{label}: {n} endpoints. "))
        .collect();

    ChangelogEntry {
        id: new_id("chg"),
        entry_type: ChangelogType::Changed,
        breaking: result.breaks_detected,
        summary: format!("Synced from OpenAPI: {}", summary_parts.join(" ")),
        details: Some(super::truncate(&details, MAX_CHANGELOG_DETAILS_LEN)),
        released_at,
    }
}

/// Marks a contract as having an import in flight until dropped.
struct ImportGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    contract_id: String,
}

impl<'a> ImportGuard<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<String>>, contract_id: &str) -> Result<Self> {
        let mut set = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(contract_id.to_string()) {
            warn!(contract_id, "Rejecting concurrent import");
            return Err(Error::ImportInProgress {
                contract_id: contract_id.to_string(),
            });
        }
        Ok(Self {
            in_flight,
            contract_id: contract_id.to_string(),
        })
    }
}

impl Drop for ImportGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.contract_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changelog_entry_lists_only_nonzero_counts() {
        let result = ImportResult {
            added_count: 2,
            updated_count: 0,
            deleted_count: 1,
            breaks_detected: true,
            breaking_changes: Vec::new(),
        };

        let entry = sync_changelog_entry(&result, 42);
        assert_eq!(entry.entry_type, ChangelogType::Changed);
        assert!(entry.breaking);
        assert_eq!(entry.summary, "Synced from OpenAPI: +2 -1");
        assert_eq!(
            entry.details.as_deref(),
            Some("Added: 2 endpoints. Removed: 1 endpoints. ")
        );
        assert_eq!(entry.released_at, 42);
    }

    #[test]
    fn test_guard_rejects_second_holder_until_dropped() {
        let in_flight = Mutex::new(HashSet::new());

        let guard = ImportGuard::acquire(&in_flight, "api_1").unwrap();
        assert!(matches!(
            ImportGuard::acquire(&in_flight, "api_1"),
            Err(Error::ImportInProgress { .. })
        ));
        // Other contracts are unaffected
        let other = ImportGuard::acquire(&in_flight, "api_2").unwrap();

        drop(guard);
        drop(other);
        assert!(ImportGuard::acquire(&in_flight, "api_1").is_ok());
    }
}
