//! Resource usage commands

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::{self, ShapeSpec, TabularResult};
use crate::request;
use clap::Subcommand;
use std::collections::BTreeMap;

const BASE_URL: &str = "/resource_providers/{uuid}/usages";

const SHAPE: ShapeSpec = ShapeSpec::KeyedMap {
    key_column: "resource_class",
    fields: &["usage"],
};

/// Usage subcommands
#[derive(Subcommand, Debug)]
pub enum UsageCommands {
    /// Show resource usages per class for a resource provider
    Show {
        /// UUID of the resource provider
        uuid: String,
    },
}

pub async fn handle(client: &PlacementClient, cmd: UsageCommands) -> Result<Option<TabularResult>> {
    match cmd {
        UsageCommands::Show { uuid } => {
            let mut params = BTreeMap::new();
            params.insert("uuid", uuid.as_str());
            let path = request::expand_path(BASE_URL, &params)?;
            let response = client.get(&path).await?;
            let usages = response
                .get("usages")
                .ok_or_else(|| Error::malformed("response is missing \"usages\""))?;
            Ok(Some(format::format(usages, &SHAPE)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_shape_sorted_by_class() {
        let usages = json!({"VCPU": 2, "DISK_GB": 5, "MEMORY_MB": 512});
        let result = format::format(&usages, &SHAPE).unwrap();
        assert_eq!(result.columns, vec!["resource_class", "usage"]);
        assert_eq!(
            result.rows,
            vec![
                vec!["DISK_GB", "5"],
                vec!["MEMORY_MB", "512"],
                vec!["VCPU", "2"],
            ]
        );
    }
}
