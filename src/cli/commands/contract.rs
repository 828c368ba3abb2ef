//! API contract commands.
//!
//! - `apireg contract add <name>` - Register a contract
//! - `apireg contract list [--query] [--lifecycle] [--team]` - List or search contracts
//! - `apireg contract show <id>` - Show one contract with its endpoint count
//! - `apireg contract set-spec-url <id> <url>` - Configure the OpenAPI URL
//! - `apireg contract lifecycle <id> <stage>` - Change lifecycle stage

use super::{format_timestamp, open_storage, print_json, resolve_actor};
use crate::cli::{ContractAddArgs, ContractCommands};
use crate::error::{Error, Result};
use crate::model::ApiContract;
use crate::storage::{ContractFilter, SqliteStorage};
use crate::validate::parse_lifecycle;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContractOutput {
    #[serde(flatten)]
    contract: ApiContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint_count: Option<usize>,
}

#[derive(Serialize)]
struct ContractListOutput {
    contracts: Vec<ApiContract>,
    count: usize,
}

/// Execute a contract command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(
    command: &ContractCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    match command {
        ContractCommands::Add(args) => execute_add(&mut storage, args, &actor, json),
        ContractCommands::List {
            query,
            lifecycle,
            team,
        } => {
            let filter = ContractFilter {
                query: query.clone(),
                lifecycle: lifecycle.as_deref().map(parse_lifecycle).transpose()?,
                owner_team: team.clone(),
            };
            execute_list(&storage, &filter, json)
        }
        ContractCommands::Show { id } => execute_show(&storage, id, json),
        ContractCommands::SetSpecUrl { id, url, clear } => {
            let url = if *clear { None } else { url.as_deref() };
            execute_set_spec_url(&mut storage, id, url, &actor, json)
        }
        ContractCommands::Lifecycle { id, lifecycle } => {
            let lifecycle = parse_lifecycle(lifecycle)?;
            storage.set_lifecycle(id, lifecycle, &actor)?;
            print_contract(&storage, id, json)
        }
    }
}

fn execute_add(storage: &mut SqliteStorage, args: &ContractAddArgs, actor: &str, json: bool) -> Result<()> {
    let name = args.name.trim();
    let team = args.team.trim();
    if name.is_empty() || team.is_empty() {
        return Err(Error::InvalidArgument(
            "Contract name and owner team must not be blank".to_string(),
        ));
    }

    let mut contract = ApiContract::new(
        name.to_string(),
        args.base_url.trim().to_string(),
        args.api_version.trim().to_string(),
        team.to_string(),
    );
    contract.description.clone_from(&args.description);
    contract.open_api_url = args
        .spec_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from);
    if let Some(lifecycle) = &args.lifecycle {
        contract.lifecycle = parse_lifecycle(lifecycle)?;
    }

    storage.create_contract(&contract, actor)?;

    if json {
        print_json(&contract)?;
    } else {
        println!("{} {}", "Registered contract:".green(), contract.name.bold());
        println!("  ID: {}", contract.id);
        println!("  Team: {}", contract.owner_team);
        if let Some(url) = contract.spec_url() {
            println!("  OpenAPI: {url}");
        } else {
            println!();
            println!("Next: apireg contract set-spec-url {} <url>", contract.id);
        }
    }
    Ok(())
}

fn execute_list(storage: &SqliteStorage, filter: &ContractFilter, json: bool) -> Result<()> {
    let contracts = storage.search_contracts(filter)?;

    if json {
        return print_json(&ContractListOutput {
            count: contracts.len(),
            contracts,
        });
    }

    if contracts.is_empty() {
        if filter.query.is_some() || filter.lifecycle.is_some() || filter.owner_team.is_some() {
            println!("No contracts match the filter.");
            return Ok(());
        }
        println!("No contracts registered.");
        println!("\nRegister one with: apireg contract add <name> --base-url <url> --team <team>");
        return Ok(());
    }

    println!("{}", format!("Contracts ({}):", contracts.len()).bold());
    for contract in &contracts {
        let spec = if contract.spec_url().is_some() {
            "openapi".cyan().to_string()
        } else {
            "-".dimmed().to_string()
        };
        println!(
            "  {}  {} v{}  [{}]  team={}  {}",
            contract.id.dimmed(),
            contract.name.bold(),
            contract.version,
            contract.lifecycle,
            contract.owner_team,
            spec
        );
    }
    Ok(())
}

fn execute_show(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    print_contract(storage, id, json)
}

fn execute_set_spec_url(
    storage: &mut SqliteStorage,
    id: &str,
    url: Option<&str>,
    actor: &str,
    json: bool,
) -> Result<()> {
    if let Some(url) = url {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| Error::InvalidArgument(format!("Invalid OpenAPI URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidArgument(format!(
                "OpenAPI URL must use http or https: '{url}'"
            )));
        }
    }

    storage.set_spec_url(id, url, actor)?;
    print_contract(storage, id, json)
}

fn print_contract(storage: &SqliteStorage, id: &str, json: bool) -> Result<()> {
    let contract = storage
        .get_contract(id)?
        .ok_or_else(|| Error::ContractNotFound { id: id.to_string() })?;
    let endpoint_count = storage.list_endpoints(id)?.len();

    if json {
        return print_json(&ContractOutput {
            contract,
            endpoint_count: Some(endpoint_count),
        });
    }

    println!("{} {}", contract.name.bold(), format!("v{}", contract.version).dimmed());
    println!("  ID:        {}", contract.id);
    println!("  Team:      {}", contract.owner_team);
    println!("  Base URL:  {}", contract.base_url);
    println!("  Lifecycle: {}", contract.lifecycle);
    println!(
        "  OpenAPI:   {}",
        contract.spec_url().unwrap_or("(not configured)")
    );
    if let Some(description) = &contract.description {
        println!("  About:     {description}");
    }
    println!("  Endpoints: {endpoint_count}");
    println!("  Updated:   {}", format_timestamp(contract.updated_at));
    Ok(())
}
