//! Consumer allocation commands
//!
//! Setting allocations is a full replacement of the consumer's existing
//! allocations on the server, never a merge. Retaining an existing class
//! means repeating it; an explicit zero amount removes it.

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::{self, ShapeSpec, TabularResult};
use crate::request::{self, allocation_body, parse_allocations, Operation};
use clap::Subcommand;
use std::collections::BTreeMap;

const CONSUMER_URL: &str = "/allocations/{uuid}";

const SHAPE: ShapeSpec = ShapeSpec::KeyedMap {
    key_column: "resource_provider",
    fields: &["generation", "resources"],
};

/// Allocation subcommands
#[derive(Subcommand, Debug)]
pub enum AllocationCommands {
    /// Replace the set of resource allocations for a given consumer.
    ///
    /// This is a full replacement of the existing allocations. To retain an
    /// existing resource class allocation while adding a new one, specify
    /// all resource class allocations, old and new.
    Set {
        /// UUID of the consumer
        uuid: String,

        /// An allocation group, e.g.
        /// rp=<provider-uuid>,VCPU=2,MEMORY_MB=512.
        /// Specify the option multiple times to allocate from multiple
        /// providers. An amount of 0 removes that class on overwrite
        #[arg(long)]
        allocation: Vec<String>,
    },

    /// Show resource allocations for a given consumer
    Show {
        /// UUID of the consumer
        uuid: String,
    },

    /// Delete all resource allocations for a given consumer
    Delete {
        /// UUID of the consumer
        uuid: String,
    },
}

pub async fn handle(
    client: &PlacementClient,
    cmd: AllocationCommands,
) -> Result<Option<TabularResult>> {
    match cmd {
        AllocationCommands::Set { uuid, allocation } => set(client, uuid, allocation).await,
        AllocationCommands::Show { uuid } => {
            let path = consumer_path(&uuid)?;
            let stored = client.get(&path).await?;
            Ok(Some(format_allocations(&stored)?))
        }
        AllocationCommands::Delete { uuid } => {
            let path = consumer_path(&uuid)?;
            client
                .request(Operation::Delete.method(), &path, &[], None)
                .await?;
            Ok(None)
        }
    }
}

fn consumer_path(uuid: &str) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("uuid", uuid);
    request::expand_path(CONSUMER_URL, &params)
}

async fn set(
    client: &PlacementClient,
    uuid: String,
    allocation: Vec<String>,
) -> Result<Option<TabularResult>> {
    let allocations = parse_allocations(&allocation)?;
    if allocations.is_empty() {
        return Err(Error::invalid_arg(
            "at least one resource allocation must be specified",
        ));
    }

    let path = consumer_path(&uuid)?;
    let body = allocation_body(&allocations);
    client
        .request(Operation::Update.method(), &path, &[], Some(&body))
        .await?;

    // Fetch and display the stored state rather than echoing the input.
    let stored = client.get(&path).await?;
    Ok(Some(format_allocations(&stored)?))
}

fn format_allocations(response: &serde_json::Value) -> Result<TabularResult> {
    let per_provider = response
        .get("allocations")
        .ok_or_else(|| Error::malformed("response is missing \"allocations\""))?;
    format::format(per_provider, &SHAPE)
}
