//! Endpoint commands.
//!
//! Manual endpoint edits for contracts without an OpenAPI document, or
//! to seed a registry before the first import.

use super::{open_storage, print_json, resolve_actor};
use crate::cli::EndpointCommands;
use crate::error::{Error, Result};
use crate::model::{Endpoint, NormalizedOperation};
use crate::storage::SqliteStorage;
use crate::validate::{parse_method, validate_path};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointListOutput {
    contract_id: String,
    endpoints: Vec<Endpoint>,
    count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemovedOutput<'a> {
    contract_id: &'a str,
    removed: &'a str,
}

/// Execute an endpoint command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(
    command: &EndpointCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    match command {
        EndpointCommands::List { contract } => execute_list(&storage, contract, json),
        EndpointCommands::Add {
            contract,
            method,
            path,
            description,
            deprecated,
        } => {
            let mut operation = NormalizedOperation::new(parse_method(method)?, validate_path(path)?);
            operation.description = description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from);
            operation.deprecated = *deprecated;

            let endpoint = storage.add_endpoint(contract, &operation, &actor)?;
            if json {
                print_json(&endpoint)
            } else {
                println!(
                    "{} {} {}",
                    "Added endpoint:".green(),
                    endpoint.method.to_string().bold(),
                    endpoint.path
                );
                println!("  ID: {}", endpoint.id);
                Ok(())
            }
        }
        EndpointCommands::Remove { contract, endpoint } => {
            storage.remove_endpoint(contract, endpoint, &actor)?;
            if json {
                print_json(&RemovedOutput {
                    contract_id: contract,
                    removed: endpoint,
                })
            } else {
                println!("Removed endpoint {endpoint}");
                Ok(())
            }
        }
    }
}

fn execute_list(storage: &SqliteStorage, contract_id: &str, json: bool) -> Result<()> {
    if storage.get_contract(contract_id)?.is_none() {
        return Err(Error::ContractNotFound {
            id: contract_id.to_string(),
        });
    }
    let endpoints = storage.list_endpoints(contract_id)?;

    if json {
        return print_json(&EndpointListOutput {
            contract_id: contract_id.to_string(),
            count: endpoints.len(),
            endpoints,
        });
    }

    if endpoints.is_empty() {
        println!("No endpoints.");
        println!("\nImport them with: apireg sync import {contract_id}");
        return Ok(());
    }

    println!("{}", format!("Endpoints ({}):", endpoints.len()).bold());
    for endpoint in &endpoints {
        let method = format!("{:<6}", endpoint.method.as_str());
        let flag = if endpoint.deprecated {
            " (deprecated)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {}{}  {}",
            method.bold(),
            endpoint.path,
            flag,
            endpoint.description.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(())
}
