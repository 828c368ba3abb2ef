//! Initialize the registry database.
//!
//! By default the database lives at `~/.apireg/data/registry.db`
//! (`~/.apireg/test/registry.db` when `APIREG_TEST_DB=1`). `--db` or
//! `APIREG_DB` points it anywhere else.

use crate::config::resolve_db_path;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    recreated: bool,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or_else(|| {
        Error::Config("Could not determine the registry directory".to_string())
    })?;

    let existed = db_path.exists();
    if existed && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if existed {
        remove_database(&db_path)?;
    }

    // Opening applies the schema
    SqliteStorage::open(&db_path)?;
    info!(path = %db_path.display(), recreated = existed, "Initialized registry database");

    if json {
        let output = InitOutput {
            database: db_path,
            recreated: existed,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized registry database");
        println!("  Database: {}", db_path.display());
        println!();
        println!("Next: register an API with 'apireg contract add <name> --base-url <url> --team <team>'");
    }

    Ok(())
}

/// Delete the database file and its WAL/SHM companions.
fn remove_database(db_path: &Path) -> Result<()> {
    fs::remove_file(db_path)?;
    for suffix in ["-wal", "-shm"] {
        let mut companion = db_path.as_os_str().to_owned();
        companion.push(suffix);
        let companion = PathBuf::from(companion);
        if companion.exists() {
            fs::remove_file(companion)?;
        }
    }
    Ok(())
}
