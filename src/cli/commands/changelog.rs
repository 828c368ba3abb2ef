//! Changelog commands.
//!
//! Imports write their own CHANGED entries; `changelog add` records the
//! rest (ADDED, DEPRECATED, REMOVED, FIXED) by hand.

use super::{format_timestamp, open_storage, print_json, resolve_actor};
use crate::cli::{ChangelogAddArgs, ChangelogCommands};
use crate::error::{Error, Result};
use crate::model::{new_id, ChangelogEntry};
use crate::storage::SqliteStorage;
use crate::validate::parse_changelog_type;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangelogListOutput {
    contract_id: String,
    entries: Vec<ChangelogEntry>,
    count: usize,
}

const MAX_SUMMARY_LEN: usize = 200;
const MAX_DETAILS_LEN: usize = 1000;

/// Execute a changelog command.
///
/// # Errors
///
/// Returns an error if the database is missing, the contract is unknown,
/// or an entry fails validation.
pub fn execute(
    command: &ChangelogCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;

    match command {
        ChangelogCommands::Add(args) => execute_add(&mut storage, args, &resolve_actor(actor), json),
        ChangelogCommands::List { contract } => {
            if storage.get_contract(contract)?.is_none() {
                return Err(Error::ContractNotFound {
                    id: contract.clone(),
                });
            }
            let entries = storage.list_changelog(contract)?;

            if json {
                return print_json(&ChangelogListOutput {
                    contract_id: contract.clone(),
                    count: entries.len(),
                    entries,
                });
            }

            if entries.is_empty() {
                println!("No changelog entries.");
                return Ok(());
            }

            for entry in &entries {
                let kind = if entry.breaking {
                    format!("{} BREAKING", entry.entry_type.as_str()).red().bold()
                } else {
                    entry.entry_type.as_str().cyan()
                };
                println!(
                    "{}  {}  {}",
                    format_timestamp(entry.released_at).dimmed(),
                    kind,
                    entry.summary
                );
                if let Some(details) = &entry.details {
                    println!("    {}", details.trim_end());
                }
            }
            Ok(())
        }
    }
}

fn execute_add(
    storage: &mut SqliteStorage,
    args: &ChangelogAddArgs,
    actor: &str,
    json: bool,
) -> Result<()> {
    let entry = build_entry(args)?;
    storage.add_changelog_entry(&args.contract, &entry, actor)?;

    if json {
        return print_json(&entry);
    }
    println!(
        "{} {} {}",
        "Recorded changelog entry:".green(),
        entry.entry_type.as_str().bold(),
        entry.summary
    );
    println!("  ID: {}", entry.id);
    Ok(())
}

/// Validate the arguments into an entry.
fn build_entry(args: &ChangelogAddArgs) -> Result<ChangelogEntry> {
    let entry_type = parse_changelog_type(&args.entry_type)?;

    let summary = args.summary.trim();
    if summary.is_empty() {
        return Err(Error::InvalidArgument("Summary must not be blank".to_string()));
    }
    if summary.chars().count() > MAX_SUMMARY_LEN {
        return Err(Error::InvalidArgument(format!(
            "Summary must not exceed {MAX_SUMMARY_LEN} characters"
        )));
    }

    let details = args
        .details
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if details.is_some_and(|d| d.chars().count() > MAX_DETAILS_LEN) {
        return Err(Error::InvalidArgument(format!(
            "Details must not exceed {MAX_DETAILS_LEN} characters"
        )));
    }

    let released_at = match &args.released_at {
        Some(raw) => chrono::DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|e| Error::InvalidArgument(format!("Invalid --released-at '{raw}': {e}")))?
            .timestamp_millis(),
        None => chrono::Utc::now().timestamp_millis(),
    };

    Ok(ChangelogEntry {
        id: new_id("chg"),
        entry_type,
        breaking: args.breaking,
        summary: summary.to_string(),
        details: details.map(String::from),
        released_at,
    })
}
