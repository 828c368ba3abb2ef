//! Command implementations.

pub mod changelog;
pub mod completions;
pub mod contract;
pub mod endpoint;
pub mod init;
pub mod sync;
pub mod version;

use crate::config::{default_actor, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use std::path::PathBuf;

/// Resolve the database path and make sure `apireg init` has created it.
fn require_db(db_path: Option<&PathBuf>) -> Result<PathBuf> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }
    Ok(db_path)
}

/// Open the initialized database.
fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    SqliteStorage::open(&require_db(db_path)?)
}

fn resolve_actor(actor: Option<&str>) -> String {
    actor.map_or_else(default_actor, String::from)
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
