//! Trait commands
//!
//! Covers both the global trait catalogue and per-provider associations.
//! All trait operations appeared in microversion 1.6. Setting provider
//! traits is a full replacement, and the write carries the provider
//! generation fetched just beforehand, so concurrent managers can conflict.

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::TabularResult;
use crate::request::{self, validate_custom_name, Operation};
use crate::version::{check_operation, Microversion};
use clap::Subcommand;
use serde_json::json;
use std::collections::BTreeMap;

const BASE_URL: &str = "/traits";
const PER_TRAIT_URL: &str = "/traits/{name}";
const RP_URL: &str = "/resource_providers/{uuid}";
const RP_TRAITS_URL: &str = "/resource_providers/{uuid}/traits";

const TRAIT_MIN: Microversion = Microversion::new(1, 6);

/// Trait subcommands
#[derive(Subcommand, Debug)]
pub enum TraitCommands {
    /// List valid trait names.
    ///
    /// Requires at least version 1.6
    List {
        /// Filter expression over trait names. Supported operators:
        /// startswith:<prefix> and in:<name>,<name>,...
        #[arg(long)]
        name: Option<String>,

        /// Only return traits associated with at least one resource provider
        #[arg(long)]
        associated: bool,
    },

    /// Check that a trait name exists.
    ///
    /// Requires at least version 1.6
    Show {
        /// Name of the trait
        name: String,
    },

    /// Create a new custom trait.
    ///
    /// Custom traits must begin with CUSTOM_ and contain only the letters
    /// A through Z, the digits 0 through 9 and underscores. Requires at
    /// least version 1.6
    Create {
        /// Name of the trait, prefixed with CUSTOM_
        name: String,
    },

    /// Delete a custom trait.
    ///
    /// Requires at least version 1.6
    Delete {
        /// Name of the trait
        name: String,
    },

    /// List traits associated with a resource provider.
    ///
    /// Requires at least version 1.6
    ProviderList {
        /// UUID of the resource provider
        uuid: String,
    },

    /// Replace the traits associated with a resource provider.
    ///
    /// All previously associated traits are replaced by the given set.
    /// Requires at least version 1.6
    ProviderSet {
        /// UUID of the resource provider
        uuid: String,

        /// Name of a trait. May be repeated; an empty set clears all
        /// associations
        #[arg(long = "trait")]
        traits: Vec<String>,
    },

    /// Dissociate all traits from a resource provider.
    ///
    /// Requires at least version 1.6
    ProviderDelete {
        /// UUID of the resource provider
        uuid: String,
    },
}

pub async fn handle(client: &PlacementClient, cmd: TraitCommands) -> Result<Option<TabularResult>> {
    let negotiated = client.api_version();
    match cmd {
        TraitCommands::List { name, associated } => {
            check_operation("trait list", TRAIT_MIN, negotiated)?;
            let mut query: Vec<(String, String)> = vec![];
            if let Some(name) = name {
                query.push(("name".to_string(), name));
            }
            if associated {
                query.push(("associated".to_string(), "true".to_string()));
            }
            let response = client
                .request(Operation::List.method(), BASE_URL, &query, None)
                .await?;
            Ok(Some(trait_names(&response)?))
        }
        TraitCommands::Show { name } => {
            check_operation("trait show", TRAIT_MIN, negotiated)?;
            let path = trait_path(&name)?;
            // The server returns an empty body; existence is the answer.
            client.get(&path).await?;
            let mut result = TabularResult::new(vec!["name".to_string()]);
            result.push_row(vec![name]);
            Ok(Some(result))
        }
        TraitCommands::Create { name } => {
            check_operation("trait create", TRAIT_MIN, negotiated)?;
            validate_custom_name("trait", &name)?;
            let path = trait_path(&name)?;
            client
                .request(reqwest::Method::PUT, &path, &[], None)
                .await?;
            Ok(None)
        }
        TraitCommands::Delete { name } => {
            check_operation("trait delete", TRAIT_MIN, negotiated)?;
            let path = trait_path(&name)?;
            client
                .request(Operation::Delete.method(), &path, &[], None)
                .await?;
            Ok(None)
        }
        TraitCommands::ProviderList { uuid } => {
            check_operation("provider trait list", TRAIT_MIN, negotiated)?;
            let path = provider_traits_path(&uuid)?;
            let response = client.get(&path).await?;
            Ok(Some(trait_names(&response)?))
        }
        TraitCommands::ProviderSet { uuid, traits } => {
            provider_set(client, uuid, traits).await
        }
        TraitCommands::ProviderDelete { uuid } => {
            check_operation("provider trait delete", TRAIT_MIN, negotiated)?;
            let path = provider_traits_path(&uuid)?;
            client
                .request(Operation::Delete.method(), &path, &[], None)
                .await?;
            Ok(None)
        }
    }
}

async fn provider_set(
    client: &PlacementClient,
    uuid: String,
    traits: Vec<String>,
) -> Result<Option<TabularResult>> {
    check_operation("provider trait set", TRAIT_MIN, client.api_version())?;

    // The write needs the provider's current generation.
    let mut params = BTreeMap::new();
    params.insert("uuid", uuid.as_str());
    let rp_path = request::expand_path(RP_URL, &params)?;
    let provider = client.get(&rp_path).await?;
    let generation = provider
        .get("generation")
        .and_then(|g| g.as_i64())
        .ok_or_else(|| Error::malformed("resource provider is missing \"generation\""))?;

    let path = provider_traits_path(&uuid)?;
    let body = json!({
        "resource_provider_generation": generation,
        "traits": traits,
    });
    let response = client
        .request(Operation::Update.method(), &path, &[], Some(&body))
        .await?;
    Ok(Some(trait_names(&response)?))
}

fn trait_path(name: &str) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("name", name);
    request::expand_path(PER_TRAIT_URL, &params)
}

fn provider_traits_path(uuid: &str) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("uuid", uuid);
    request::expand_path(RP_TRAITS_URL, &params)
}

/// Render the `traits` array of a response as a one-column table.
fn trait_names(response: &serde_json::Value) -> Result<TabularResult> {
    let traits = response
        .get("traits")
        .and_then(|t| t.as_array())
        .ok_or_else(|| Error::malformed("response is missing \"traits\""))?;
    let mut result = TabularResult::new(vec!["name".to_string()]);
    for t in traits {
        let name = t
            .as_str()
            .ok_or_else(|| Error::malformed("trait names must be strings"))?;
        result.push_row(vec![name.to_string()]);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        cmd: TraitCommands,
    }

    #[test]
    fn test_parse_list_filters() {
        let cli = TestCli::try_parse_from([
            "test",
            "list",
            "--name",
            "startswith:CUSTOM",
            "--associated",
        ])
        .unwrap();
        assert_matches!(
            cli.cmd,
            TraitCommands::List { name: Some(name), associated: true }
                if name == "startswith:CUSTOM"
        );
    }

    #[test]
    fn test_parse_provider_set_repeated() {
        let cli = TestCli::try_parse_from([
            "test",
            "provider-set",
            "rp1",
            "--trait",
            "HW_CPU_X86_AVX",
            "--trait",
            "CUSTOM_FOO",
        ])
        .unwrap();
        assert_matches!(
            cli.cmd,
            TraitCommands::ProviderSet { uuid, traits }
                if uuid == "rp1" && traits.len() == 2
        );
    }

    #[test]
    fn test_parse_provider_set_empty_clears() {
        let cli = TestCli::try_parse_from(["test", "provider-set", "rp1"]).unwrap();
        assert_matches!(
            cli.cmd,
            TraitCommands::ProviderSet { traits, .. } if traits.is_empty()
        );
    }

    #[test]
    fn test_trait_names() {
        let response = json!({"traits": ["HW_CPU_X86_SSE", "CUSTOM_FOO"]});
        let result = trait_names(&response).unwrap();
        assert_eq!(result.columns, vec!["name"]);
        assert_eq!(result.rows, vec![vec!["HW_CPU_X86_SSE"], vec!["CUSTOM_FOO"]]);
    }

    #[test]
    fn test_trait_names_malformed() {
        assert_matches!(
            trait_names(&json!({"traits": "oops"})),
            Err(Error::MalformedResponse(_))
        );
    }

    #[test]
    fn test_operation_gate() {
        let err = check_operation("trait list", TRAIT_MIN, Microversion::new(1, 5)).unwrap_err();
        assert_matches!(
            err,
            Error::NotSupported { ref required, ref negotiated, .. }
                if required == "1.6" && negotiated == "1.5"
        );
    }
}
