//! OpenAPI sync commands.
//!
//! - `apireg sync preview <contract>` - Diff the remote document against the store
//! - `apireg sync import <contract> --mode merge|replace` - Apply it
//! - `apireg sync runs <contract>` - Sync run history
//! - `apireg sync show <run-id>` - One run with its breaking changes
//! - `apireg sync refresh-all` - Import every contract with an OpenAPI URL

use super::{format_timestamp, print_json, require_db, resolve_actor};
use crate::cli::SyncCommands;
use crate::config::{resolve_fetch_timeout, resolve_refresh_mode};
use crate::error::{Error, Result};
use crate::model::{BreakingChange, SyncRun, SyncStatus};
use crate::sync::{Diff, HttpSpecFetcher, ImportCoordinator, ImportResult, RefreshSummary};
use crate::validate::parse_mode;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncRunListOutput {
    contract_id: String,
    runs: Vec<SyncRun>,
    count: usize,
}

/// Execute a sync command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(
    command: &SyncCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let db_path = require_db(db_path)?;

    let timeout = match command {
        SyncCommands::Preview { timeout, .. }
        | SyncCommands::Import { timeout, .. }
        | SyncCommands::RefreshAll { timeout, .. } => *timeout,
        SyncCommands::Runs { .. } | SyncCommands::Show { .. } => None,
    };
    let timeout = match timeout {
        Some(0) => {
            return Err(Error::InvalidArgument(
                "--timeout must be at least 1 second".to_string(),
            ))
        }
        Some(secs) => Duration::from_secs(secs),
        None => resolve_fetch_timeout(),
    };

    let fetcher = HttpSpecFetcher::new(timeout)?;
    let coordinator = ImportCoordinator::new(db_path, fetcher)
        .with_fetch_timeout(timeout)
        .with_actor(resolve_actor(actor));

    match command {
        SyncCommands::Runs { contract } => execute_runs(&coordinator, contract, json),
        SyncCommands::Show { id } => {
            let run = coordinator.get_sync_run(id)?;
            if json {
                print_json(&run)
            } else {
                print_run(&run, true);
                Ok(())
            }
        }
        SyncCommands::Preview { contract, .. } => {
            let diff = block_on(coordinator.preview_diff(contract))?;
            if json {
                print_json(&diff)
            } else {
                print_diff(&diff);
                Ok(())
            }
        }
        SyncCommands::Import { contract, mode, .. } => {
            let mode = parse_mode(mode)?;
            let result = block_on(coordinator.import_openapi(contract, mode))?;
            if json {
                print_json(&result)
            } else {
                print_import(&result, mode.as_str());
                Ok(())
            }
        }
        SyncCommands::RefreshAll { mode, .. } => {
            let mode = match mode {
                Some(mode) => parse_mode(mode)?,
                None => resolve_refresh_mode(),
            };
            let summary = block_on(coordinator.refresh_all(mode))?;
            if json {
                print_json(&summary)
            } else {
                print_refresh(&summary);
                Ok(())
            }
        }
    }
}

/// Run a future to completion on a fresh runtime.
fn block_on<F: std::future::Future<Output = Result<T>>, T>(future: F) -> Result<T> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
    rt.block_on(future)
}

fn execute_runs(
    coordinator: &ImportCoordinator<HttpSpecFetcher>,
    contract_id: &str,
    json: bool,
) -> Result<()> {
    let runs = coordinator.list_sync_runs(contract_id)?;

    if json {
        return print_json(&SyncRunListOutput {
            contract_id: contract_id.to_string(),
            count: runs.len(),
            runs,
        });
    }

    if runs.is_empty() {
        println!("No sync runs recorded.");
        return Ok(());
    }
    for run in &runs {
        print_run(run, false);
    }
    Ok(())
}

fn print_diff(diff: &Diff) {
    if diff.is_empty() {
        println!("{}", "Already in sync: no changes.".green());
        return;
    }

    if !diff.added.is_empty() {
        println!("{}", format!("Added ({}):", diff.added.len()).green().bold());
        for op in &diff.added {
            println!("  + {} {}", op.method.as_str().bold(), op.path);
        }
    }
    if !diff.changed.is_empty() {
        println!("{}", format!("Changed ({}):", diff.changed.len()).yellow().bold());
        for change in &diff.changed {
            println!(
                "  ~ {} {}  {}",
                change.current.method.as_str().bold(),
                change.current.path,
                change.change_description.dimmed()
            );
        }
    }
    if !diff.removed.is_empty() {
        println!("{}", format!("Removed ({}):", diff.removed.len()).red().bold());
        for endpoint in &diff.removed {
            println!("  - {} {}", endpoint.method.as_str().bold(), endpoint.path);
        }
        println!(
            "{}",
            "Removed endpoints are breaking changes; only --mode replace deletes them.".yellow()
        );
    }
}

fn print_import(result: &ImportResult, mode: &str) {
    println!("{} ({mode})", "Imported OpenAPI spec".green().bold());
    println!(
        "  Added: {}  Updated: {}  Deleted: {}",
        result.added_count, result.updated_count, result.deleted_count
    );
    print_breaking(&result.breaking_changes);
}

fn print_run(run: &SyncRun, detailed: bool) {
    let status = match run.status {
        SyncStatus::Success => run.status.as_str().green(),
        SyncStatus::Failed => run.status.as_str().red(),
    };
    let breaks = if run.breaks_detected {
        " BREAKING".red().bold().to_string()
    } else {
        String::new()
    };
    println!(
        "{}  {}  {:<7}  {:<7}  +{} ~{} -{}{}",
        run.id.dimmed(),
        format_timestamp(run.run_at),
        status,
        run.mode.as_str(),
        run.added_count,
        run.updated_count,
        run.deleted_count,
        breaks
    );
    if let Some(message) = &run.error_message {
        println!("    {}", message.red());
    }
    if detailed {
        print_breaking(&run.breaking_changes);
    }
}

fn print_breaking(changes: &[BreakingChange]) {
    if changes.is_empty() {
        return;
    }
    println!("  {}", format!("Breaking changes ({}):", changes.len()).red().bold());
    for change in changes {
        println!(
            "    {} {} {}",
            change.change_type.as_str().red(),
            change.method.as_str().bold(),
            change.path
        );
    }
}

fn print_refresh(summary: &RefreshSummary) {
    println!(
        "Refreshed {} API(s): {} succeeded, {} failed",
        summary.total_apis,
        summary.succeeded.to_string().green(),
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        }
    );
    for failure in &summary.failures {
        println!(
            "  {} {} {}",
            failure.api_name.bold(),
            failure.api_id.dimmed(),
            failure.reason.red()
        );
    }
}
