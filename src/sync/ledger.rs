//! Append-only ledger of sync runs.
//!
//! Rows are only ever inserted; triggers in the schema reject UPDATE and
//! DELETE on both ledger tables.

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::model::{new_id, BreakingChange, SyncMode, SyncRun, SyncStatus};
use crate::storage::sqlite::parse_column;

/// Longest error message kept on a failed run.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

impl SyncRun {
    /// A successful run with its counts and breaking changes.
    #[must_use]
    pub fn succeeded(
        contract_id: &str,
        mode: SyncMode,
        run_at: i64,
        counts: (usize, usize, usize),
        breaking_changes: Vec<BreakingChange>,
    ) -> Self {
        let (added_count, updated_count, deleted_count) = counts;
        Self {
            id: new_id("run"),
            contract_id: contract_id.to_string(),
            run_at,
            status: SyncStatus::Success,
            mode,
            added_count,
            updated_count,
            deleted_count,
            breaks_detected: !breaking_changes.is_empty(),
            error_message: None,
            breaking_changes,
        }
    }

    /// A failed run: zero counts, no breaks, and the (truncated) error.
    #[must_use]
    pub fn failed(contract_id: &str, mode: SyncMode, run_at: i64, error: &str) -> Self {
        Self {
            id: new_id("run"),
            contract_id: contract_id.to_string(),
            run_at,
            status: SyncStatus::Failed,
            mode,
            added_count: 0,
            updated_count: 0,
            deleted_count: 0,
            breaks_detected: false,
            error_message: Some(super::truncate(error, MAX_ERROR_MESSAGE_LEN)),
            breaking_changes: Vec::new(),
        }
    }
}

/// Append a run and its breaking changes.
///
/// Call inside a transaction when the run must commit together with other
/// writes.
///
/// # Errors
///
/// Returns an error if an insert fails.
pub fn insert_sync_run(conn: &Connection, run: &SyncRun) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_runs (id, contract_id, run_at, status, mode, added_count, updated_count, deleted_count, breaks_detected, error_message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            run.id,
            run.contract_id,
            run.run_at,
            run.status.as_str(),
            run.mode.as_str(),
            run.added_count,
            run.updated_count,
            run.deleted_count,
            run.breaks_detected,
            run.error_message,
        ],
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO breaking_changes (sync_run_id, change_type, method, path, details)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for change in &run.breaking_changes {
        stmt.execute(rusqlite::params![
            run.id,
            change.change_type.as_str(),
            change.method.as_str(),
            change.path,
            change.details,
        ])?;
    }
    Ok(())
}

/// All runs of a contract, newest first. Runs sharing a timestamp come
/// back in reverse insertion order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_sync_runs(conn: &Connection, contract_id: &str) -> Result<Vec<SyncRun>> {
    let mut stmt = conn.prepare(
        "SELECT id, contract_id, run_at, status, mode, added_count, updated_count, deleted_count, breaks_detected, error_message
         FROM sync_runs WHERE contract_id = ?1
         ORDER BY run_at DESC, rowid DESC",
    )?;
    let mut runs = stmt
        .query_map([contract_id], map_sync_run_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for run in &mut runs {
        run.breaking_changes = breaking_changes_for(conn, &run.id)?;
    }
    Ok(runs)
}

/// One run by ID.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_sync_run(conn: &Connection, id: &str) -> Result<Option<SyncRun>> {
    let run = conn
        .query_row(
            "SELECT id, contract_id, run_at, status, mode, added_count, updated_count, deleted_count, breaks_detected, error_message
             FROM sync_runs WHERE id = ?1",
            [id],
            map_sync_run_row,
        )
        .optional()?;

    match run {
        Some(mut run) => {
            run.breaking_changes = breaking_changes_for(conn, &run.id)?;
            Ok(Some(run))
        }
        None => Ok(None),
    }
}

fn breaking_changes_for(conn: &Connection, run_id: &str) -> Result<Vec<BreakingChange>> {
    let mut stmt = conn.prepare_cached(
        "SELECT change_type, method, path, details
         FROM breaking_changes WHERE sync_run_id = ?1 ORDER BY id",
    )?;
    let changes = stmt
        .query_map([run_id], |row| {
            Ok(BreakingChange {
                change_type: parse_column(row, 0)?,
                method: parse_column(row, 1)?,
                path: row.get(2)?,
                details: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(changes)
}

// Helper to map sync run rows (breaking changes are loaded separately)
fn map_sync_run_row(row: &rusqlite::Row) -> rusqlite::Result<SyncRun> {
    Ok(SyncRun {
        id: row.get(0)?,
        contract_id: row.get(1)?,
        run_at: row.get(2)?,
        status: parse_column(row, 3)?,
        mode: parse_column(row, 4)?,
        added_count: row.get(5)?,
        updated_count: row.get(6)?,
        deleted_count: row.get(7)?,
        breaks_detected: row.get(8)?,
        error_message: row.get(9)?,
        breaking_changes: Vec::new(),
    })
}
