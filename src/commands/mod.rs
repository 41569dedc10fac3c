//! CLI command definitions
//!
//! The command tree mirrors the Placement resource families. Global options
//! (endpoint, microversion, output format) apply to every subcommand; the
//! environment is consulted once here, at parse time.

pub mod aggregate;
pub mod allocation;
pub mod candidate;
pub mod inventory;
pub mod provider;
pub mod resource_class;
pub mod traits;
pub mod usage;

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};

/// Command-line client for the OpenStack Placement API
#[derive(Parser, Debug)]
#[command(name = "placement")]
#[command(version)]
#[command(about = "Manage resource providers, inventories, allocations, \
    resource classes, traits and aggregates")]
pub struct Cli {
    /// Placement service endpoint
    #[arg(
        long,
        env = "PLACEMENT_ENDPOINT",
        default_value = "http://localhost:8778"
    )]
    pub endpoint: String,

    /// API microversion, e.g. 1.4, or "latest"
    #[arg(long = "os-placement-api-version", env = "OS_PLACEMENT_API_VERSION")]
    pub api_version: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage resource providers
    #[command(subcommand)]
    Provider(provider::ProviderCommands),

    /// Manage resource provider inventories
    #[command(subcommand)]
    Inventory(inventory::InventoryCommands),

    /// Manage consumer allocations
    #[command(subcommand)]
    Allocation(allocation::AllocationCommands),

    /// Manage resource classes
    #[command(subcommand)]
    Class(resource_class::ClassCommands),

    /// Manage traits and provider trait associations
    #[command(subcommand)]
    Trait(traits::TraitCommands),

    /// Manage resource provider aggregates
    #[command(subcommand)]
    Aggregate(aggregate::AggregateCommands),

    /// Show resource usages
    #[command(subcommand)]
    Usage(usage::UsageCommands),

    /// List allocation candidates
    #[command(subcommand)]
    Candidate(candidate::CandidateCommands),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_help() {
        // --help short-circuits parsing with an error by design.
        let result = Cli::try_parse_from(["placement", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "placement",
            "--endpoint",
            "http://placement:8778",
            "--os-placement-api-version",
            "1.6",
            "--format",
            "json",
            "trait",
            "list",
        ])
        .unwrap();
        assert_eq!(cli.endpoint, "http://placement:8778");
        assert_eq!(cli.api_version.as_deref(), Some("1.6"));
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_format_default_is_table() {
        let cli = Cli::try_parse_from(["placement", "class", "list"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Table);
    }
}
