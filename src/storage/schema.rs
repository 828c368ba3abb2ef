//! Database schema definitions.
//!
//! This module contains the complete SQLite schema for the registry.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the registry database.
///
/// Note: Timestamps are stored as INTEGER (Unix milliseconds).
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Registry Tables
-- ====================

-- Contracts: one row per registered API
CREATE TABLE IF NOT EXISTS contracts (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    base_url TEXT NOT NULL,
    version TEXT NOT NULL,
    owner_team TEXT NOT NULL,
    lifecycle TEXT NOT NULL DEFAULT 'DRAFT'
        CHECK (lifecycle IN ('DRAFT', 'ACTIVE', 'DEPRECATED')),
    open_api_url TEXT,
    description TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (name, owner_team)
);

CREATE INDEX IF NOT EXISTS idx_contracts_owner ON contracts(owner_team);

-- Endpoints: (method, path) is the natural key within a contract
CREATE TABLE IF NOT EXISTS endpoints (
    id TEXT PRIMARY KEY,
    contract_id TEXT NOT NULL,
    method TEXT NOT NULL
        CHECK (method IN ('GET', 'POST', 'PUT', 'PATCH', 'DELETE')),
    path TEXT NOT NULL,
    description TEXT,
    deprecated INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    UNIQUE (contract_id, method, path),
    FOREIGN KEY (contract_id) REFERENCES contracts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_endpoints_contract ON endpoints(contract_id, created_at);

-- Changelog entries
CREATE TABLE IF NOT EXISTS changelog_entries (
    id TEXT PRIMARY KEY,
    contract_id TEXT NOT NULL,
    entry_type TEXT NOT NULL
        CHECK (entry_type IN ('ADDED', 'CHANGED', 'DEPRECATED', 'REMOVED', 'FIXED')),
    breaking INTEGER NOT NULL DEFAULT 0,
    summary TEXT NOT NULL,
    details TEXT,
    released_at INTEGER NOT NULL,
    FOREIGN KEY (contract_id) REFERENCES contracts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_changelog_contract ON changelog_entries(contract_id, released_at);

-- ====================
-- Sync Run Ledger (append-only)
-- ====================

CREATE TABLE IF NOT EXISTS sync_runs (
    id TEXT PRIMARY KEY,
    contract_id TEXT NOT NULL,
    run_at INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('SUCCESS', 'FAILED')),
    mode TEXT NOT NULL CHECK (mode IN ('MERGE', 'REPLACE')),
    added_count INTEGER NOT NULL DEFAULT 0,
    updated_count INTEGER NOT NULL DEFAULT 0,
    deleted_count INTEGER NOT NULL DEFAULT 0,
    breaks_detected INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    FOREIGN KEY (contract_id) REFERENCES contracts(id)
);

CREATE INDEX IF NOT EXISTS idx_sync_runs_contract ON sync_runs(contract_id, run_at DESC);

CREATE TABLE IF NOT EXISTS breaking_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sync_run_id TEXT NOT NULL,
    change_type TEXT NOT NULL
        CHECK (change_type IN ('REMOVED_ENDPOINT', 'PATH_CHANGED', 'METHOD_CHANGED')),
    method TEXT NOT NULL,
    path TEXT NOT NULL,
    details TEXT,
    FOREIGN KEY (sync_run_id) REFERENCES sync_runs(id)
);

CREATE INDEX IF NOT EXISTS idx_breaking_changes_run ON breaking_changes(sync_run_id);

CREATE TRIGGER IF NOT EXISTS sync_runs_no_update
BEFORE UPDATE ON sync_runs
BEGIN
    SELECT RAISE(ABORT, 'sync runs are append-only');
END;

CREATE TRIGGER IF NOT EXISTS sync_runs_no_delete
BEFORE DELETE ON sync_runs
BEGIN
    SELECT RAISE(ABORT, 'sync runs are append-only');
END;

CREATE TRIGGER IF NOT EXISTS breaking_changes_no_update
BEFORE UPDATE ON breaking_changes
BEGIN
    SELECT RAISE(ABORT, 'breaking changes are append-only');
END;

CREATE TRIGGER IF NOT EXISTS breaking_changes_no_delete
BEFORE DELETE ON breaking_changes
BEGIN
    SELECT RAISE(ABORT, 'breaking changes are append-only');
END;

-- ====================
-- Audit Events
-- ====================

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    actor TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    comment TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
";

/// Apply pragmas and the schema to a connection.
///
/// Connection pragmas are set on every open. DDL and the version row are
/// only written when the current version is not recorded yet, so opening
/// an up-to-date database never takes the write lock.
///
/// # Errors
///
/// Returns an error if a pragma or DDL statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    if is_current(conn)? {
        return Ok(());
    }

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            schema_version(),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

fn schema_version() -> String {
    format!("v{CURRENT_SCHEMA_VERSION}")
}

/// Whether this database already records the current schema version.
fn is_current(conn: &Connection) -> Result<bool> {
    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(false);
    }

    let recorded = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
        [schema_version()],
        |row| row.get(0),
    )?;
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_contract(conn: &Connection) {
        conn.execute(
            "INSERT INTO contracts (id, name, base_url, version, owner_team, created_at, updated_at)
             VALUES ('api_1', 'Users', 'http://users', '1.0', 'identity', 0, 0)",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "contracts",
            "endpoints",
            "changelog_entries",
            "sync_runs",
            "breaking_changes",
            "events",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");
    }

    #[test]
    fn test_reopening_current_database_needs_no_write_lock() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("registry.db");
        let writer = Connection::open(&path).unwrap();
        apply_schema(&writer).unwrap();
        writer.execute_batch("BEGIN IMMEDIATE").unwrap();

        // No busy wait: any write attempt would fail immediately
        let reader = Connection::open(&path).unwrap();
        reader.busy_timeout(std::time::Duration::ZERO).unwrap();
        apply_schema(&reader).expect("reopen must not write");

        let count: i64 = reader
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        writer.execute_batch("ROLLBACK").unwrap();
    }

    #[test]
    fn test_endpoint_natural_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        seed_contract(&conn);

        let insert = "INSERT INTO endpoints (id, contract_id, method, path, created_at)
                      VALUES (?1, 'api_1', 'GET', '/users', 0)";
        conn.execute(insert, ["ep_1"]).unwrap();
        assert!(conn.execute(insert, ["ep_2"]).is_err());

        // Paths are compared case-sensitively
        conn.execute(
            "INSERT INTO endpoints (id, contract_id, method, path, created_at)
             VALUES ('ep_3', 'api_1', 'GET', '/Users', 0)",
            [],
        )
        .unwrap();
    }

    #[test]
    fn test_sync_runs_are_append_only() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        seed_contract(&conn);

        conn.execute(
            "INSERT INTO sync_runs (id, contract_id, run_at, status, mode)
             VALUES ('run_1', 'api_1', 0, 'FAILED', 'MERGE')",
            [],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE sync_runs SET status = 'SUCCESS' WHERE id = 'run_1'", [])
            .is_err());
        assert!(conn
            .execute("DELETE FROM sync_runs WHERE id = 'run_1'", [])
            .is_err());
    }
}
