//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
}

pub mod commands;

/// apireg - API contract registry with OpenAPI synchronization
#[derive(Parser, Debug)]
#[command(name = "apireg", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.apireg/data/registry.db)
    #[arg(long, global = true, env = "APIREG_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "APIREG_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the registry database
    Init {
        /// Recreate the database if it already exists
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// API contract management
    Contract {
        #[command(subcommand)]
        command: ContractCommands,
    },

    /// Endpoint management
    Endpoint {
        #[command(subcommand)]
        command: EndpointCommands,
    },

    /// Changelog entries
    Changelog {
        #[command(subcommand)]
        command: ChangelogCommands,
    },

    /// Synchronize endpoints with OpenAPI documents
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Contract Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ContractCommands {
    /// Register a new API contract
    Add(ContractAddArgs),

    /// List registered contracts
    List {
        /// Text to find in name, base URL, team, version or description
        #[arg(long)]
        query: Option<String>,

        /// Only contracts in this lifecycle stage
        #[arg(long)]
        lifecycle: Option<String>,

        /// Only contracts owned by this team
        #[arg(long)]
        team: Option<String>,
    },

    /// Show one contract
    Show {
        /// Contract ID
        id: String,
    },

    /// Set or clear the OpenAPI URL
    SetSpecUrl {
        /// Contract ID
        id: String,

        /// http(s) URL of the OpenAPI document
        #[arg(required_unless_present = "clear")]
        url: Option<String>,

        /// Remove the configured URL
        #[arg(long, conflicts_with = "url")]
        clear: bool,
    },

    /// Change the lifecycle stage (draft, active, deprecated)
    Lifecycle {
        /// Contract ID
        id: String,

        /// New lifecycle stage
        lifecycle: String,
    },
}

#[derive(Args, Debug)]
pub struct ContractAddArgs {
    /// API name (unique per owner team)
    pub name: String,

    /// Base URL the API is served from
    #[arg(long)]
    pub base_url: String,

    /// Owning team
    #[arg(long)]
    pub team: String,

    /// API version
    #[arg(long = "api-version", default_value = "1.0.0")]
    pub api_version: String,

    /// OpenAPI document URL
    #[arg(long)]
    pub spec_url: Option<String>,

    /// Free-form description
    #[arg(long, short)]
    pub description: Option<String>,

    /// Initial lifecycle stage
    #[arg(long)]
    pub lifecycle: Option<String>,
}

// ============================================================================
// Endpoint Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum EndpointCommands {
    /// List the endpoints of a contract
    List {
        /// Contract ID
        contract: String,
    },

    /// Add an endpoint by hand
    Add {
        /// Contract ID
        contract: String,

        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path, e.g. /users/{id}
        path: String,

        /// Description
        #[arg(long, short)]
        description: Option<String>,

        /// Mark the endpoint deprecated
        #[arg(long)]
        deprecated: bool,
    },

    /// Remove an endpoint
    Remove {
        /// Contract ID
        contract: String,

        /// Endpoint ID
        endpoint: String,
    },
}

// ============================================================================
// Changelog Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ChangelogCommands {
    /// List changelog entries, newest first
    List {
        /// Contract ID
        contract: String,
    },

    /// Record a changelog entry by hand
    Add(ChangelogAddArgs),
}

#[derive(Args, Debug)]
pub struct ChangelogAddArgs {
    /// Contract ID
    pub contract: String,

    /// Entry type (added, changed, deprecated, removed, fixed)
    #[arg(long = "type", short = 't')]
    pub entry_type: String,

    /// One-line summary (max 200 characters)
    #[arg(long, short)]
    pub summary: String,

    /// Longer details (max 1000 characters)
    #[arg(long, short)]
    pub details: Option<String>,

    /// Flag the change as breaking for consumers
    #[arg(long)]
    pub breaking: bool,

    /// Release time as RFC 3339 (default: now)
    #[arg(long)]
    pub released_at: Option<String>,
}

// ============================================================================
// Sync Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Show what an import would change, without writing anything
    Preview {
        /// Contract ID
        contract: String,

        /// Fetch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Import the contract's OpenAPI document
    Import {
        /// Contract ID
        contract: String,

        /// merge (add + update) or replace (also delete missing endpoints)
        #[arg(long, short, default_value = "merge")]
        mode: String,

        /// Fetch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List recorded sync runs, newest first
    Runs {
        /// Contract ID
        contract: String,
    },

    /// Show one sync run with its breaking changes
    Show {
        /// Sync run ID
        id: String,
    },

    /// Import every contract that has an OpenAPI URL
    RefreshAll {
        /// merge or replace (default from config, else merge)
        #[arg(long, short)]
        mode: Option<String>,

        /// Fetch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}
