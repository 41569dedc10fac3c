//! Resource class commands
//!
//! Resource class operations appeared in microversion 1.2; the idempotent
//! `set` (PUT create-or-verify) followed in 1.7. Standard classes cannot be
//! created or deleted, so mutations validate the `CUSTOM_` prefix locally.

use crate::client::PlacementClient;
use crate::error::{Error, Result};
use crate::format::{self, ShapeSpec, TabularResult};
use crate::request::{self, validate_custom_name, Operation};
use crate::version::{check_operation, Microversion};
use clap::Subcommand;
use serde_json::json;
use std::collections::BTreeMap;

const BASE_URL: &str = "/resource_classes";
const PER_CLASS_URL: &str = "/resource_classes/{name}";
const FIELDS: &[&str] = &["name"];

const SHOW_SHAPE: ShapeSpec = ShapeSpec::Scalar { fields: FIELDS };
const LIST_SHAPE: ShapeSpec = ShapeSpec::ListOf { fields: FIELDS };

const CLASS_MIN: Microversion = Microversion::new(1, 2);
const SET_MIN: Microversion = Microversion::new(1, 7);

/// Resource class subcommands
#[derive(Subcommand, Debug)]
pub enum ClassCommands {
    /// List all resource classes.
    ///
    /// Requires at least version 1.2
    List,

    /// Create a new custom resource class.
    ///
    /// Requires at least version 1.2
    Create {
        /// Name of the resource class, prefixed with CUSTOM_
        name: String,
    },

    /// Create a custom resource class if it does not already exist.
    ///
    /// Unlike create, this also succeeds when the class is already present,
    /// making it an idempotent check-or-create. Requires at least
    /// version 1.7
    Set {
        /// Name of the resource class, prefixed with CUSTOM_
        name: String,
    },

    /// Show a single resource class.
    ///
    /// Requires at least version 1.2
    Show {
        /// Name of the resource class
        name: String,
    },

    /// Delete a custom resource class.
    ///
    /// Standard resource classes cannot be deleted. Requires at least
    /// version 1.2
    Delete {
        /// Name of the resource class
        name: String,
    },
}

pub async fn handle(client: &PlacementClient, cmd: ClassCommands) -> Result<Option<TabularResult>> {
    let negotiated = client.api_version();
    match cmd {
        ClassCommands::List => {
            check_operation("resource class list", CLASS_MIN, negotiated)?;
            let response = client.get(BASE_URL).await?;
            let classes = response
                .get("resource_classes")
                .ok_or_else(|| Error::malformed("response is missing \"resource_classes\""))?;
            Ok(Some(format::format(classes, &LIST_SHAPE)?))
        }
        ClassCommands::Create { name } => {
            check_operation("resource class create", CLASS_MIN, negotiated)?;
            validate_custom_name("resource class", &name)?;
            let body = json!({ "name": name });
            client
                .request(Operation::Create.method(), BASE_URL, &[], Some(&body))
                .await?;
            Ok(None)
        }
        ClassCommands::Set { name } => {
            check_operation("resource class set", SET_MIN, negotiated)?;
            validate_custom_name("resource class", &name)?;
            let path = class_path(&name)?;
            client
                .request(reqwest::Method::PUT, &path, &[], None)
                .await?;
            Ok(None)
        }
        ClassCommands::Show { name } => {
            check_operation("resource class show", CLASS_MIN, negotiated)?;
            let path = class_path(&name)?;
            let resource = client.get(&path).await?;
            Ok(Some(format::format(&resource, &SHOW_SHAPE)?))
        }
        ClassCommands::Delete { name } => {
            check_operation("resource class delete", CLASS_MIN, negotiated)?;
            let path = class_path(&name)?;
            client
                .request(Operation::Delete.method(), &path, &[], None)
                .await?;
            Ok(None)
        }
    }
}

fn class_path(name: &str) -> Result<String> {
    let mut params = BTreeMap::new();
    params.insert("name", name);
    request::expand_path(PER_CLASS_URL, &params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        cmd: ClassCommands,
    }

    #[test]
    fn test_parse_create() {
        let cli = TestCli::try_parse_from(["test", "create", "CUSTOM_GOLD"]).unwrap();
        assert_matches!(cli.cmd, ClassCommands::Create { name } if name == "CUSTOM_GOLD");
    }

    #[test]
    fn test_class_path() {
        assert_eq!(
            class_path("CUSTOM_GOLD").unwrap(),
            "/resource_classes/CUSTOM_GOLD"
        );
    }

    #[test]
    fn test_operation_gates() {
        check_operation("resource class list", CLASS_MIN, Microversion::new(1, 2)).unwrap();
        let err =
            check_operation("resource class list", CLASS_MIN, Microversion::new(1, 1)).unwrap_err();
        assert_matches!(err, Error::NotSupported { .. });

        // set requires 1.7 even though other class operations work at 1.2.
        let err =
            check_operation("resource class set", SET_MIN, Microversion::new(1, 6)).unwrap_err();
        assert_matches!(
            err,
            Error::NotSupported { ref required, .. } if required == "1.7"
        );
    }

    #[test]
    fn test_custom_name_validation() {
        validate_custom_name("resource class", "CUSTOM_GOLD_1").unwrap();
        assert_matches!(
            validate_custom_name("resource class", "VCPU"),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            validate_custom_name("resource class", "CUSTOM_lower"),
            Err(Error::InvalidArgument(_))
        );
    }
}
