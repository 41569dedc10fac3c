//! Command dispatch
//!
//! Ties the parsed CLI together: negotiate the microversion once, build one
//! client carrying it, route to the resource module, and print whatever
//! tabular result the command produced.

use crate::client::PlacementClient;
use crate::commands::{self, Cli, Commands};
use crate::error::Result;
use crate::output;
use crate::version;
use tracing::debug;

/// Run a parsed CLI invocation to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let negotiated = version::negotiate(cli.api_version.as_deref())?;
    debug!(%negotiated, endpoint = %cli.endpoint, "negotiated microversion");

    let client = PlacementClient::new(cli.endpoint, negotiated)?;

    let result = match cli.command {
        Commands::Provider(cmd) => commands::provider::handle(&client, cmd).await?,
        Commands::Inventory(cmd) => commands::inventory::handle(&client, cmd).await?,
        Commands::Allocation(cmd) => commands::allocation::handle(&client, cmd).await?,
        Commands::Class(cmd) => commands::resource_class::handle(&client, cmd).await?,
        Commands::Trait(cmd) => commands::traits::handle(&client, cmd).await?,
        Commands::Aggregate(cmd) => commands::aggregate::handle(&client, cmd).await?,
        Commands::Usage(cmd) => commands::usage::handle(&client, cmd).await?,
        Commands::Candidate(cmd) => commands::candidate::handle(&client, cmd).await?,
    };

    if let Some(result) = result {
        output::print(&result, cli.format);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use clap::Parser;

    #[tokio::test]
    async fn test_invalid_version_fails_before_any_request() {
        // The endpoint is unroutable; an invalid version must fail first.
        let cli = Cli::try_parse_from([
            "placement",
            "--endpoint",
            "http://192.0.2.1:1",
            "--os-placement-api-version",
            "2.0",
            "trait",
            "list",
        ])
        .unwrap();
        let err = run(cli).await.unwrap_err();
        assert_matches!(err, Error::InvalidVersion { .. });
    }

    #[tokio::test]
    async fn test_operation_gate_fails_before_any_request() {
        // trait list requires 1.6; the default version is 1.0.
        let cli = Cli::try_parse_from([
            "placement",
            "--endpoint",
            "http://192.0.2.1:1",
            "trait",
            "list",
        ])
        .unwrap();
        let err = run(cli).await.unwrap_err();
        assert_matches!(err, Error::NotSupported { .. });
        assert!(err.is_local());
    }

    #[tokio::test]
    async fn test_field_gate_fails_before_any_request() {
        let cli = Cli::try_parse_from([
            "placement",
            "--endpoint",
            "http://192.0.2.1:1",
            "--os-placement-api-version",
            "1.2",
            "provider",
            "list",
            "--aggregate-uuid",
            "agg1",
        ])
        .unwrap();
        let err = run(cli).await.unwrap_err();
        assert_matches!(err, Error::FieldNotSupported { .. });
    }
}
