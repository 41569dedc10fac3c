//! Inventory commands

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::{self, ShapeSpec, TabularResult};
use crate::request::{self, parse_inventory_resource, InventoryValue, Operation};
use crate::version::{check_fields, check_operation, FieldRequirement, Microversion};
use clap::Subcommand;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

const BASE_URL: &str = "/resource_providers/{uuid}/inventories";
const PER_CLASS_URL: &str = "/resource_providers/{uuid}/inventories/{resource_class}";
const RP_URL: &str = "/resource_providers/{uuid}";

const FIELDS: &[&str] = &[
    "allocation_ratio",
    "min_unit",
    "max_unit",
    "reserved",
    "step_size",
    "total",
];

const CLASS_SHAPE: ShapeSpec = ShapeSpec::Scalar { fields: FIELDS };
const MAP_SHAPE: ShapeSpec = ShapeSpec::KeyedMap {
    key_column: "resource_class",
    fields: FIELDS,
};

const SET_REQUIREMENTS: &[FieldRequirement] = &[FieldRequirement::new("aggregate", 1, 3)];
const DELETE_ALL_MIN: Microversion = Microversion::new(1, 5);

/// Inventory subcommands
#[derive(Subcommand, Debug)]
pub enum InventoryCommands {
    /// Replace the set of inventory records for a resource provider.
    ///
    /// By default this is a full replacement of the existing inventory. To
    /// retain existing records while adding new ones, specify all resource
    /// class inventories, old and new, or pass --amend. A resource without an
    /// inventory field sets the total, so VCPU=16 equals VCPU:total=16.
    Set {
        /// UUID of the resource provider, or of the aggregate when
        /// --aggregate is specified
        uuid: String,

        /// String describing a resource, e.g. VCPU=16 or
        /// MEMORY_MB:step_size=128. May be repeated
        #[arg(long)]
        resource: Vec<String>,

        /// Set the inventories of every resource provider that is a member
        /// of the aggregate <uuid>. Requires at least version 1.3
        #[arg(long)]
        aggregate: bool,

        /// Amend the existing inventories instead of fully replacing them
        #[arg(long)]
        amend: bool,

        /// Show the inventories that would be set without setting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Replace the inventory record of a single class for a provider
    ClassSet {
        /// UUID of the resource provider
        uuid: String,

        /// Name of the resource class
        resource_class: String,

        /// The actual amount of the resource the provider can accommodate
        #[arg(long, required = true)]
        total: i64,

        /// Ratio by which consumption may exceed physical constraints
        #[arg(long)]
        allocation_ratio: Option<f64>,

        /// Minimum amount any single allocation can have
        #[arg(long)]
        min_unit: Option<i64>,

        /// Maximum amount any single allocation can have
        #[arg(long)]
        max_unit: Option<i64>,

        /// Amount of the resource reserved for the provider's own use
        #[arg(long)]
        reserved: Option<i64>,

        /// Divisible amount in which the resource may be requested
        #[arg(long)]
        step_size: Option<i64>,
    },

    /// List inventories for a given resource provider
    List {
        /// UUID of the resource provider
        uuid: String,
    },

    /// Show the inventory for a given resource provider/class pair
    Show {
        /// UUID of the resource provider
        uuid: String,

        /// Name of the resource class
        resource_class: String,
    },

    /// Delete the inventory for a provider/class pair, or all inventories
    /// of the provider when --resource-class is omitted (requires at least
    /// version 1.5)
    Delete {
        /// UUID of the resource provider
        uuid: String,

        /// Name of the resource class
        #[arg(long)]
        resource_class: Option<String>,
    },
}

pub async fn handle(
    client: &PlacementClient,
    cmd: InventoryCommands,
) -> Result<Option<TabularResult>> {
    match cmd {
        InventoryCommands::Set {
            uuid,
            resource,
            aggregate,
            amend,
            dry_run,
        } => set(client, uuid, resource, aggregate, amend, dry_run).await,
        InventoryCommands::ClassSet {
            uuid,
            resource_class,
            total,
            allocation_ratio,
            min_unit,
            max_unit,
            reserved,
            step_size,
        } => {
            let mut fields: Vec<(&str, InventoryValue)> =
                vec![("total", InventoryValue::Int(total))];
            if let Some(v) = allocation_ratio {
                fields.push(("allocation_ratio", InventoryValue::Float(v)));
            }
            if let Some(v) = min_unit {
                fields.push(("min_unit", InventoryValue::Int(v)));
            }
            if let Some(v) = max_unit {
                fields.push(("max_unit", InventoryValue::Int(v)));
            }
            if let Some(v) = reserved {
                fields.push(("reserved", InventoryValue::Int(v)));
            }
            if let Some(v) = step_size {
                fields.push(("step_size", InventoryValue::Int(v)));
            }
            class_set(client, uuid, resource_class, fields).await
        }
        InventoryCommands::List { uuid } => {
            let path = expand(BASE_URL, &uuid, None)?;
            let response = client.get(&path).await?;
            Ok(Some(format_inventories(&response)?))
        }
        InventoryCommands::Show {
            uuid,
            resource_class,
        } => {
            let path = expand(PER_CLASS_URL, &uuid, Some(&resource_class))?;
            let inventory = client.get(&path).await?;
            Ok(Some(format::format(&inventory, &CLASS_SHAPE)?))
        }
        InventoryCommands::Delete {
            uuid,
            resource_class,
        } => {
            let path = match resource_class {
                Some(class) => expand(PER_CLASS_URL, &uuid, Some(&class))?,
                None => {
                    check_operation(
                        "inventory delete (all classes)",
                        DELETE_ALL_MIN,
                        client.api_version(),
                    )?;
                    expand(BASE_URL, &uuid, None)?
                }
            };
            client
                .request(Operation::Delete.method(), &path, &[], None)
                .await?;
            Ok(None)
        }
    }
}

fn expand(template: &str, uuid: &str, class: Option<&str>) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("uuid", uuid);
    if let Some(class) = class {
        params.insert("resource_class", class);
    }
    request::expand_path(template, &params)
}

async fn set(
    client: &PlacementClient,
    uuid: String,
    resource: Vec<String>,
    aggregate: bool,
    amend: bool,
    dry_run: bool,
) -> Result<Option<TabularResult>> {
    let mut used = vec![];
    if aggregate {
        used.push("aggregate");
    }
    check_fields(&used, client.api_version(), SET_REQUIREMENTS)?;

    // Parse every resource argument before the first request.
    let mut parsed = Vec::with_capacity(resource.len());
    for r in &resource {
        parsed.push(parse_inventory_resource(r)?);
    }

    let providers = if aggregate {
        let query = vec![("member_of".to_string(), uuid.clone())];
        let response = client
            .request(Operation::List.method(), super::provider::BASE_URL, &query, None)
            .await?;
        let providers = response
            .get("resource_providers")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::malformed("response is missing \"resource_providers\""))?
            .clone();
        if providers.is_empty() {
            return Err(Error::invalid_arg(format!(
                "no resource providers found in aggregate with uuid {uuid}"
            )));
        }
        providers
    } else {
        let path = expand(RP_URL, &uuid, None)?;
        vec![client.get(&path).await?]
    };

    let mut results: Vec<(String, Value)> = Vec::with_capacity(providers.len());
    let mut failures = 0usize;
    for provider in &providers {
        let rp_uuid = provider
            .get("uuid")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::malformed("resource provider is missing \"uuid\""))?
            .to_string();
        let path = expand(BASE_URL, &rp_uuid, None)?;

        let mut payload = if amend {
            // Start from the provider's current inventory records.
            client.get(&path).await?
        } else {
            json!({
                "inventories": {},
                "resource_provider_generation": provider.get("generation").cloned()
                    .unwrap_or(Value::Null),
            })
        };

        let inventories = payload
            .get_mut("inventories")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::malformed("response is missing \"inventories\""))?;
        for (class, field, value) in &parsed {
            let entry = inventories
                .entry(class.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            entry[field.as_str()] = (*value).into();
        }

        if dry_run {
            results.push((rp_uuid, payload));
            continue;
        }
        match client
            .request(Operation::Update.method(), &path, &[], Some(&payload))
            .await
        {
            Ok(stored) => results.push((rp_uuid, stored)),
            Err(e) if aggregate => {
                // Keep going over the rest of the aggregate, report at the end.
                warn!("failed to set inventory for resource provider {rp_uuid}: {e}");
                failures += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if failures > 0 {
        return Err(Error::Failed(format!(
            "failed to set inventory for {failures} of {} resource providers",
            providers.len()
        )));
    }

    if aggregate {
        // Prefix each row with its provider so the batched output stays
        // attributable.
        let mut combined = TabularResult::new(
            std::iter::once("resource_provider".to_string())
                .chain(
                    std::iter::once("resource_class".to_string())
                        .chain(FIELDS.iter().map(|f| f.to_string())),
                )
                .collect(),
        );
        for (rp_uuid, stored) in &results {
            let table = format_inventories(stored)?;
            for row in table.rows {
                let mut prefixed = Vec::with_capacity(row.len() + 1);
                prefixed.push(rp_uuid.clone());
                prefixed.extend(row);
                combined.push_row(prefixed);
            }
        }
        Ok(Some(combined))
    } else {
        Ok(Some(format_inventories(&results[0].1)?))
    }
}

async fn class_set(
    client: &PlacementClient,
    uuid: String,
    resource_class: String,
    fields: Vec<(&str, InventoryValue)>,
) -> Result<Option<TabularResult>> {
    // The PUT payload needs the provider's current generation.
    let rp_path = expand(RP_URL, &uuid, None)?;
    let provider = client.get(&rp_path).await?;
    let generation = provider
        .get("generation")
        .cloned()
        .ok_or_else(|| Error::malformed("resource provider is missing \"generation\""))?;

    let mut payload = json!({ "resource_provider_generation": generation });
    for (field, value) in fields {
        payload[field] = value.into();
    }

    let path = expand(PER_CLASS_URL, &uuid, Some(&resource_class))?;
    let stored = client
        .request(Operation::Update.method(), &path, &[], Some(&payload))
        .await?;
    Ok(Some(format::format(&stored, &CLASS_SHAPE)?))
}

fn format_inventories(response: &Value) -> Result<TabularResult> {
    let inventories = response
        .get("inventories")
        .ok_or_else(|| Error::malformed("response is missing \"inventories\""))?;
    format::format(inventories, &MAP_SHAPE)
}
