//! Resource provider commands

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::{self, ShapeSpec, TabularResult};
use crate::request::{self, parse_resource_filter, Operation};
use crate::version::{check_fields, FieldRequirement};
use clap::Subcommand;
use serde_json::json;
use std::collections::BTreeMap;

pub const BASE_URL: &str = "/resource_providers";
const ALLOCATIONS_URL: &str = "/resource_providers/{uuid}/allocations";
const FIELDS: &[&str] = &["uuid", "name", "generation"];

const SHOW_SHAPE: ShapeSpec = ShapeSpec::Scalar { fields: FIELDS };
const SHOW_WITH_ALLOCATIONS_SHAPE: ShapeSpec = ShapeSpec::Scalar {
    fields: &["uuid", "name", "generation", "allocations"],
};
const LIST_SHAPE: ShapeSpec = ShapeSpec::ListOf { fields: FIELDS };

const LIST_FILTERS: &[&str] = &["name", "uuid", "member_of", "resources"];
const LIST_REQUIREMENTS: &[FieldRequirement] = &[
    FieldRequirement::new("aggregate-uuid", 1, 3),
    FieldRequirement::new("resource", 1, 4),
];

/// Resource provider subcommands
#[derive(Subcommand, Debug)]
pub enum ProviderCommands {
    /// Create a new resource provider
    Create {
        /// Name of the resource provider
        name: String,

        /// UUID of the resource provider
        #[arg(long)]
        uuid: Option<String>,
    },

    /// List resource providers
    List {
        /// Filter by UUID
        #[arg(long)]
        uuid: Option<String>,

        /// Filter by name
        #[arg(long)]
        name: Option<String>,

        /// UUID of an aggregate the listed providers must be a member of.
        /// May be repeated. Requires at least version 1.3
        #[arg(long = "aggregate-uuid")]
        aggregate_uuid: Vec<String>,

        /// A <resource_class>=<amount> pair the providers must have the
        /// capacity to serve. May be repeated. Requires at least version 1.4
        #[arg(long)]
        resource: Vec<String>,
    },

    /// Show resource provider details
    Show {
        /// UUID of the resource provider
        uuid: String,

        /// Include the allocations of the provider's resources
        #[arg(long)]
        allocations: bool,
    },

    /// Update an existing resource provider
    Set {
        /// UUID of the resource provider
        uuid: String,

        /// A new name for the resource provider
        #[arg(long, required = true)]
        name: String,
    },

    /// Delete a resource provider
    Delete {
        /// UUID of the resource provider
        uuid: String,
    },
}

pub async fn handle(
    client: &PlacementClient,
    cmd: ProviderCommands,
) -> Result<Option<TabularResult>> {
    match cmd {
        ProviderCommands::Create { name, uuid } => create(client, name, uuid).await,
        ProviderCommands::List {
            uuid,
            name,
            aggregate_uuid,
            resource,
        } => list(client, uuid, name, aggregate_uuid, resource).await,
        ProviderCommands::Show { uuid, allocations } => show(client, uuid, allocations).await,
        ProviderCommands::Set { uuid, name } => set(client, uuid, name).await,
        ProviderCommands::Delete { uuid } => {
            let path = provider_path(&uuid)?;
            client
                .request(Operation::Delete.method(), &path, &[], None)
                .await?;
            Ok(None)
        }
    }
}

fn provider_path(uuid: &str) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("uuid", uuid);
    request::expand_path("/resource_providers/{uuid}", &params)
}

async fn create(
    client: &PlacementClient,
    name: String,
    uuid: Option<String>,
) -> Result<Option<TabularResult>> {
    let mut body = json!({ "name": name });
    if let Some(uuid) = uuid {
        body["uuid"] = json!(uuid);
    }
    let resource = client.create_and_fetch(BASE_URL, &body).await?;
    Ok(Some(format::format(&resource, &SHOW_SHAPE)?))
}

async fn list(
    client: &PlacementClient,
    uuid: Option<String>,
    name: Option<String>,
    aggregate_uuid: Vec<String>,
    resource: Vec<String>,
) -> Result<Option<TabularResult>> {
    let mut used = vec![];
    if !aggregate_uuid.is_empty() {
        used.push("aggregate-uuid");
    }
    if !resource.is_empty() {
        used.push("resource");
    }
    check_fields(&used, client.api_version(), LIST_REQUIREMENTS)?;

    let mut filters: Vec<(&str, String)> = vec![];
    if let Some(name) = name {
        filters.push(("name", name));
    }
    if let Some(uuid) = uuid {
        filters.push(("uuid", uuid));
    }
    if !aggregate_uuid.is_empty() {
        filters.push(("member_of", format!("in:{}", aggregate_uuid.join(","))));
    }
    if !resource.is_empty() {
        let resources: Vec<String> = resource
            .iter()
            .map(|r| parse_resource_filter(r).map(|(class, amount)| format!("{class}:{amount}")))
            .collect::<Result<_>>()?;
        filters.push(("resources", resources.join(",")));
    }
    let query = request::build_filters(&filters, LIST_FILTERS)?;

    let response = client
        .request(Operation::List.method(), BASE_URL, &query, None)
        .await?;
    let providers = response
        .get("resource_providers")
        .ok_or_else(|| Error::malformed("response is missing \"resource_providers\""))?;
    Ok(Some(format::format(providers, &LIST_SHAPE)?))
}

async fn show(
    client: &PlacementClient,
    uuid: String,
    allocations: bool,
) -> Result<Option<TabularResult>> {
    let path = provider_path(&uuid)?;
    let mut resource = client.get(&path).await?;

    if allocations {
        let mut params = BTreeMap::new();
        params.insert("uuid", uuid.as_str());
        let allocs_path = request::expand_path(ALLOCATIONS_URL, &params)?;
        let allocs = client.get(&allocs_path).await?;
        let allocs = allocs
            .get("allocations")
            .ok_or_else(|| Error::malformed("response is missing \"allocations\""))?
            .clone();
        resource["allocations"] = allocs;
        Ok(Some(format::format(&resource, &SHOW_WITH_ALLOCATIONS_SHAPE)?))
    } else {
        Ok(Some(format::format(&resource, &SHOW_SHAPE)?))
    }
}

async fn set(
    client: &PlacementClient,
    uuid: String,
    name: String,
) -> Result<Option<TabularResult>> {
    let path = provider_path(&uuid)?;
    let body = json!({ "name": name });
    let resource = client
        .request(Operation::Update.method(), &path, &[], Some(&body))
        .await?;
    Ok(Some(format::format(&resource, &SHOW_SHAPE)?))
}
