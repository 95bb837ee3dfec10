//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// ors - talk to openrouteservice-compatible routing APIs
///
/// Sends requests with automatic retry on rate limiting, runs batches of
/// requests, and manages the provider configuration file.
#[derive(Parser, Debug)]
#[command(
    name = "ors",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the provider configuration file
    #[arg(short, long, global = true, env = "ORS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Provider to send requests to
    #[arg(long, global = true, default_value = "openrouteservice")]
    pub provider: String,

    /// API key, overriding the one stored for the provider
    #[arg(long, global = true, env = "ORS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single request and print the response
    Request(RequestArgs),

    /// Run a file of requests one after another
    Batch(BatchArgs),

    /// List or edit configured providers
    Providers(ProvidersArgs),
}

/// Arguments for the request command
#[derive(Parser, Debug)]
pub struct RequestArgs {
    /// Endpoint path, e.g. /v2/directions/driving-car/geojson
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// JSON body, or @file to read it from a file; sends a POST
    #[arg(short, long, value_name = "JSON|@FILE")]
    pub body: Option<String>,

    /// Save the response to a file instead of printing it
    #[arg(long = "save-to", value_name = "OUTPUT_FILE")]
    pub save_to: Option<PathBuf>,
}

/// Arguments for the batch command
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// JSON file holding an array of jobs ({"id", "path", "params"?, "body"?})
    #[arg(value_name = "JOBS_FILE")]
    pub jobs_file: PathBuf,

    /// Save the report to a file instead of printing it
    #[arg(long = "save-to", value_name = "OUTPUT_FILE")]
    pub save_to: Option<PathBuf>,
}

/// Arguments for the providers command
#[derive(Parser, Debug)]
pub struct ProvidersArgs {
    #[command(subcommand)]
    pub action: Option<ProvidersAction>,
}

/// Provider management actions
#[derive(Subcommand, Debug)]
pub enum ProvidersAction {
    /// List configured providers (default)
    List,

    /// Write the default provider file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Store an API key for a provider
    SetKey {
        /// Provider name
        name: String,
        /// API key to store
        key: String,
    },

    /// Add or replace a provider
    Add {
        /// Provider name
        name: String,
        /// Origin of the routing service
        base_url: String,
        /// API key, empty for self-hosted instances
        #[arg(long, default_value = "")]
        key: String,
        /// Overall request budget in seconds
        #[arg(long, default_value_t = orsclient_core::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        /// Self-imposed request limit per rolling minute
        #[arg(long)]
        queries_per_minute: Option<u32>,
    },
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stderr().is_terminal()
    }
}

impl Commands {
    /// Whether the command creates or rewrites the provider file
    ///
    /// Such commands may point `--config` at a file that does not exist yet.
    pub fn writes_provider_file(&self) -> bool {
        matches!(
            self,
            Commands::Providers(ProvidersArgs {
                action: Some(ProvidersAction::Init { .. } | ProvidersAction::SetKey { .. } | ProvidersAction::Add { .. }),
            })
        )
    }
}
