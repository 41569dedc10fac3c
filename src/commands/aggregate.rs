//! Resource provider aggregate commands
//!
//! Aggregate associations appeared in microversion 1.1. Setting them is a
//! full replacement; an empty set clears every association. From 1.19 the
//! write must carry the provider generation and the body gains a wrapper
//! object, while older versions send the bare UUID array.

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::TabularResult;
use crate::request::{self, Operation};
use crate::version::{check_fields, check_operation, FieldRequirement, Microversion};
use clap::Subcommand;
use serde_json::json;
use std::collections::BTreeMap;

const BASE_URL: &str = "/resource_providers/{uuid}/aggregates";

const AGGREGATE_MIN: Microversion = Microversion::new(1, 1);
const GENERATION_MIN: Microversion = Microversion::new(1, 19);
const SET_REQUIREMENTS: &[FieldRequirement] = &[FieldRequirement::new("generation", 1, 19)];

/// Aggregate subcommands
#[derive(Subcommand, Debug)]
pub enum AggregateCommands {
    /// List aggregates a resource provider is associated with.
    ///
    /// Requires at least version 1.1
    List {
        /// UUID of the resource provider
        uuid: String,
    },

    /// Replace the aggregates associated with a resource provider.
    ///
    /// Previously associated aggregates are removed entirely before the new
    /// set takes effect; an empty set removes all associations. Requires at
    /// least version 1.1
    Set {
        /// UUID of the resource provider
        uuid: String,

        /// UUID of an aggregate. May be repeated
        #[arg(long)]
        aggregate: Vec<String>,

        /// Resource provider generation the write is conditioned on. The
        /// operation fails when it does not match the server side.
        /// Required from version 1.19
        #[arg(long)]
        generation: Option<i64>,
    },
}

pub async fn handle(
    client: &PlacementClient,
    cmd: AggregateCommands,
) -> Result<Option<TabularResult>> {
    let negotiated = client.api_version();
    match cmd {
        AggregateCommands::List { uuid } => {
            check_operation("aggregate list", AGGREGATE_MIN, negotiated)?;
            let path = aggregates_path(&uuid)?;
            let response = client.get(&path).await?;
            Ok(Some(aggregate_uuids(&response)?))
        }
        AggregateCommands::Set {
            uuid,
            aggregate,
            generation,
        } => set(client, uuid, aggregate, generation).await,
    }
}

async fn set(
    client: &PlacementClient,
    uuid: String,
    aggregate: Vec<String>,
    generation: Option<i64>,
) -> Result<Option<TabularResult>> {
    let negotiated = client.api_version();
    check_operation("aggregate set", AGGREGATE_MIN, negotiated)?;

    let mut used = vec![];
    if generation.is_some() {
        used.push("generation");
    }
    check_fields(&used, negotiated, SET_REQUIREMENTS)?;

    let body = if negotiated < GENERATION_MIN {
        json!(aggregate)
    } else {
        // From 1.19 the server refuses writes without a generation; fail
        // before the request rather than after.
        let generation = generation.ok_or_else(|| {
            Error::MissingArgument(format!(
                "--generation is required with version {GENERATION_MIN} and above"
            ))
        })?;
        json!({
            "aggregates": aggregate,
            "resource_provider_generation": generation,
        })
    };

    let path = aggregates_path(&uuid)?;
    let response = client
        .request(Operation::Update.method(), &path, &[], Some(&body))
        .await?;
    Ok(Some(aggregate_uuids(&response)?))
}

fn aggregates_path(uuid: &str) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("uuid", uuid);
    request::expand_path(BASE_URL, &params)
}

/// Render the `aggregates` array of a response as a one-column table.
fn aggregate_uuids(response: &serde_json::Value) -> Result<TabularResult> {
    let aggregates = response
        .get("aggregates")
        .and_then(|a| a.as_array())
        .ok_or_else(|| Error::malformed("response is missing \"aggregates\""))?;
    let mut result = TabularResult::new(vec!["uuid".to_string()]);
    for agg in aggregates {
        let uuid = agg
            .as_str()
            .ok_or_else(|| Error::malformed("aggregate uuids must be strings"))?;
        result.push_row(vec![uuid.to_string()]);
    }
    Ok(result)
}
