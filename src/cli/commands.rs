//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sophos Central API client
#[derive(Parser, Debug)]
#[command(name = "sophos-central")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML); environment variables are used otherwise
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the page size sent with paged requests
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show who the credentials belong to
    Whoami,

    /// List the endpoints available to the credentials
    Endpoints {
        /// Show every endpoint, not only the ones this scope can call
        #[arg(long)]
        all: bool,
    },

    /// List managed tenants (partner and organization credentials)
    Tenants,

    /// Call an endpoint by name
    Call {
        /// Collection or item name, e.g. `alerts` or `policy`
        name: String,

        /// Path arguments in template order; for an item name the last one is the ID
        args: Vec<String>,

        /// Extra query parameter as KEY=VALUE (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Act on behalf of this tenant (partner and organization credentials)
        #[arg(short, long)]
        tenant: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON document
    Json,
    /// Indented JSON document
    Pretty,
    /// One record per line, written as pages arrive
    Ndjson,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
