//! Request construction
//!
//! Translates validated command arguments into URL paths, query parameters,
//! and JSON bodies for the Placement API. Everything here is checked
//! client-side so a bad invocation fails before any request is sent.

use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;

// =============================================================================
// Operations
// =============================================================================

/// Resource operation kinds, mapped onto HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    List,
    Show,
    Update,
    Delete,
}

impl Operation {
    /// HTTP method used for this operation
    pub fn method(&self) -> reqwest::Method {
        match self {
            Operation::Create => reqwest::Method::POST,
            Operation::List | Operation::Show => reqwest::Method::GET,
            Operation::Update => reqwest::Method::PUT,
            Operation::Delete => reqwest::Method::DELETE,
        }
    }
}

// =============================================================================
// Path Templates
// =============================================================================

/// Expand `{placeholder}` segments in a path template.
///
/// Placeholder values come from positional command arguments (provider UUID,
/// consumer UUID, class name). A template placeholder without a value, or
/// with an empty value, fails with `MissingArgument`.
pub fn expand_path(template: &str, params: &BTreeMap<&str, &str>) -> Result<String> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let end = rest[start..]
            .find('}')
            .map(|i| start + i)
            .ok_or_else(|| Error::invalid_arg(format!("unbalanced path template {template:?}")))?;
        path.push_str(&rest[..start]);
        let name = &rest[start + 1..end];
        match params.get(name) {
            Some(value) if !value.is_empty() => path.push_str(value),
            _ => return Err(Error::MissingArgument(name.to_string())),
        }
        rest = &rest[end + 1..];
    }
    path.push_str(rest);
    Ok(path)
}

// =============================================================================
// Query Filters
// =============================================================================

/// Validate list filters against the operation's allow list.
///
/// Unknown filter names are rejected here rather than forwarded, so the user
/// gets a precise local error instead of an ambiguous server response.
pub fn build_filters(
    filters: &[(&str, String)],
    allowed: &[&str],
) -> Result<Vec<(String, String)>> {
    let mut query = Vec::with_capacity(filters.len());
    for (name, value) in filters {
        if !allowed.contains(name) {
            return Err(Error::UnsupportedFilter(name.to_string()));
        }
        query.push((name.to_string(), value.clone()));
    }
    Ok(query)
}

/// Percent-encode a query list into a URL suffix ("" when empty)
pub fn encode_query(query: &[(String, String)]) -> String {
    if query.is_empty() {
        return String::new();
    }
    let encoded: Vec<String> = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("?{}", encoded.join("&"))
}

// =============================================================================
// Allocation Parsing
// =============================================================================

/// Parsed allocations keyed by resource provider UUID.
///
/// The inner map is class name to amount. BTreeMaps keep both levels in a
/// deterministic order for request bodies and table output.
pub type Allocations = BTreeMap<String, BTreeMap<String, u64>>;

/// Parse repeated `--allocation rp=<uuid>,CLASS=amount,...` groups.
///
/// Groups addressing the same provider are merged; a class repeated for one
/// provider with a different amount is a conflict. Amounts are non-negative
/// integers and zero is kept: the allocation body is a full overwrite, and an
/// explicit zero removes that class from the consumer's allocation.
pub fn parse_allocations(allocation_strings: &[String]) -> Result<Allocations> {
    let mut allocations: Allocations = BTreeMap::new();
    for group in allocation_strings {
        if !group.contains('=') || !group.contains(',') {
            return Err(Error::invalid_arg(format!(
                "incorrect allocation string format: {group:?}, \
                 expected rp=<uuid>,<class>=<amount>,..."
            )));
        }

        let mut provider: Option<String> = None;
        let mut resources: BTreeMap<String, u64> = BTreeMap::new();
        for pair in group.split(',') {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::invalid_arg(format!("incorrect allocation string format: {group:?}"))
            })?;
            if key == "rp" {
                provider = Some(value.to_string());
            } else {
                let amount = value.parse::<u64>().map_err(|_| {
                    Error::invalid_arg(format!(
                        "allocation amount for {key} must be a non-negative integer, got {value:?}"
                    ))
                })?;
                resources.insert(key.to_string(), amount);
            }
        }

        let provider = provider.ok_or_else(|| {
            Error::invalid_arg("resource provider parameter is required for allocation string")
        })?;

        let entry = allocations.entry(provider.clone()).or_default();
        for (class, amount) in resources {
            if let Some(prev) = entry.get(&class) {
                if *prev != amount {
                    return Err(Error::invalid_arg(format!(
                        "conflict detected for resource provider {provider} \
                         resource class {class}"
                    )));
                }
            }
            entry.insert(class, amount);
        }
    }
    Ok(allocations)
}

/// Build the PUT body for an allocation set.
///
/// This is a full replacement of the consumer's allocations on the server, not
/// an incremental patch. Zero amounts stay in the body so the server drops
/// those classes.
pub fn allocation_body(allocations: &Allocations) -> Value {
    let entries: Vec<Value> = allocations
        .iter()
        .map(|(provider, resources)| {
            json!({
                "resource_provider": {"uuid": provider},
                "resources": resources,
            })
        })
        .collect();
    json!({ "allocations": entries })
}

// =============================================================================
// Inventory Parsing
// =============================================================================

/// Inventory field value, either integral or a ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InventoryValue {
    Int(i64),
    Float(f64),
}

impl From<InventoryValue> for Value {
    fn from(value: InventoryValue) -> Self {
        match value {
            InventoryValue::Int(i) => json!(i),
            InventoryValue::Float(f) => json!(f),
        }
    }
}

/// Inventory fields accepted by the API; allocation_ratio is a float
pub const INVENTORY_FIELDS: &[&str] = &[
    "allocation_ratio",
    "min_unit",
    "max_unit",
    "reserved",
    "step_size",
    "total",
];

/// Parse one `--resource CLASS[:field]=value` argument.
///
/// Without a field the value is the total, so `VCPU=16` is shorthand for
/// `VCPU:total=16`.
pub fn parse_inventory_resource(resource: &str) -> Result<(String, String, InventoryValue)> {
    let (name_part, value) = resource.split_once('=').ok_or_else(|| {
        Error::invalid_arg(format!(
            "resource argument must have \"name=value\" format, got {resource:?}"
        ))
    })?;

    let (name, field) = match name_part.split_once(':') {
        Some((name, field)) => {
            if field.contains(':') {
                return Err(Error::invalid_arg(
                    "resource argument can contain only one colon",
                ));
            }
            (name, field)
        }
        None => (name_part, "total"),
    };
    if name.is_empty() || field.is_empty() || value.is_empty() {
        return Err(Error::invalid_arg(
            "resource name, field and value must be not empty",
        ));
    }
    if !INVENTORY_FIELDS.contains(&field) {
        return Err(Error::invalid_arg(format!("unknown inventory field {field}")));
    }

    let parsed = if field == "allocation_ratio" {
        InventoryValue::Float(value.parse::<f64>().map_err(|_| {
            Error::invalid_arg(format!("{field} must be a number, got {value:?}"))
        })?)
    } else {
        InventoryValue::Int(value.parse::<i64>().map_err(|_| {
            Error::invalid_arg(format!("{field} must be an integer, got {value:?}"))
        })?)
    };
    Ok((name.to_string(), field.to_string(), parsed))
}

/// Parse a `CLASS=amount` pair used by provider list and candidate filters
pub fn parse_resource_filter(resource: &str) -> Result<(String, u64)> {
    let (class, amount) = resource.split_once('=').ok_or_else(|| {
        Error::invalid_arg(format!(
            "resource argument must have \"class=amount\" format, got {resource:?}"
        ))
    })?;
    if class.is_empty() {
        return Err(Error::invalid_arg("resource class must be not empty"));
    }
    let amount = amount.parse::<u64>().map_err(|_| {
        Error::invalid_arg(format!(
            "resource amount must be a non-negative integer, got {amount:?}"
        ))
    })?;
    Ok((class.to_string(), amount))
}

// =============================================================================
// Custom Names
// =============================================================================

/// Prefix required for deployer-defined resource classes and traits
pub const CUSTOM_PREFIX: &str = "CUSTOM_";

/// Validate a custom resource class or trait name before creation.
///
/// Only create/set operations validate; reads pass names through since
/// validity is server-authoritative.
pub fn validate_custom_name(kind: &str, name: &str) -> Result<()> {
    let valid = name.starts_with(CUSTOM_PREFIX)
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(Error::invalid_arg(format!(
            "custom {kind} name {name:?} must start with {CUSTOM_PREFIX} and contain \
             only the characters A-Z, 0-9 and _"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_operation_methods() {
        assert_eq!(Operation::Create.method(), reqwest::Method::POST);
        assert_eq!(Operation::List.method(), reqwest::Method::GET);
        assert_eq!(Operation::Show.method(), reqwest::Method::GET);
        assert_eq!(Operation::Update.method(), reqwest::Method::PUT);
        assert_eq!(Operation::Delete.method(), reqwest::Method::DELETE);
    }

    #[test]
    fn test_expand_path() {
        let mut params = BTreeMap::new();
        params.insert("uuid", "a1b2");
        let path = expand_path("/resource_providers/{uuid}/inventories", &params).unwrap();
        assert_eq!(path, "/resource_providers/a1b2/inventories");
    }

    #[test]
    fn test_expand_path_missing_placeholder() {
        let params = BTreeMap::new();
        let err = expand_path("/resource_providers/{uuid}", &params).unwrap_err();
        assert_matches!(err, Error::MissingArgument(name) if name == "uuid");
    }

    #[test]
    fn test_expand_path_empty_value() {
        let mut params = BTreeMap::new();
        params.insert("uuid", "");
        let err = expand_path("/resource_providers/{uuid}", &params).unwrap_err();
        assert_matches!(err, Error::MissingArgument(_));
    }

    #[test]
    fn test_build_filters_rejects_unknown() {
        let filters = [("bogus", "x".to_string())];
        let err = build_filters(&filters, &["name", "uuid"]).unwrap_err();
        assert_matches!(err, Error::UnsupportedFilter(name) if name == "bogus");
    }

    #[test]
    fn test_build_filters_passthrough() {
        let filters = [("name", "compute-0".to_string())];
        let query = build_filters(&filters, &["name", "uuid"]).unwrap();
        assert_eq!(query, vec![("name".to_string(), "compute-0".to_string())]);
    }

    #[test]
    fn test_encode_query() {
        let query = vec![
            ("member_of".to_string(), "in:u1,u2".to_string()),
            ("resources".to_string(), "VCPU:2".to_string()),
        ];
        assert_eq!(
            encode_query(&query),
            "?member_of=in%3Au1%2Cu2&resources=VCPU%3A2"
        );
        assert_eq!(encode_query(&[]), "");
    }

    #[test]
    fn test_parse_allocations() {
        let groups = vec![
            "rp=rp1,VCPU=2,MEMORY_MB=512".to_string(),
            "rp=rp2,DISK_GB=10".to_string(),
        ];
        let allocations = parse_allocations(&groups).unwrap();
        assert_eq!(allocations["rp1"]["VCPU"], 2);
        assert_eq!(allocations["rp1"]["MEMORY_MB"], 512);
        assert_eq!(allocations["rp2"]["DISK_GB"], 10);
    }

    #[test]
    fn test_parse_allocations_merges_same_provider() {
        let groups = vec![
            "rp=rp1,VCPU=2".to_string(),
            "rp=rp1,MEMORY_MB=512".to_string(),
        ];
        let allocations = parse_allocations(&groups).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations["rp1"].len(), 2);
    }

    #[test]
    fn test_parse_allocations_conflict() {
        let groups = vec!["rp=rp1,VCPU=2".to_string(), "rp=rp1,VCPU=4".to_string()];
        let err = parse_allocations(&groups).unwrap_err();
        assert_matches!(err, Error::InvalidArgument(msg) if msg.contains("conflict"));
    }

    #[test]
    fn test_parse_allocations_duplicate_same_amount_ok() {
        let groups = vec!["rp=rp1,VCPU=2".to_string(), "rp=rp1,VCPU=2".to_string()];
        let allocations = parse_allocations(&groups).unwrap();
        assert_eq!(allocations["rp1"]["VCPU"], 2);
    }

    #[test]
    fn test_parse_allocations_requires_rp() {
        let groups = vec!["VCPU=2,MEMORY_MB=512".to_string()];
        let err = parse_allocations(&groups).unwrap_err();
        assert_matches!(err, Error::InvalidArgument(msg) if msg.contains("provider"));
    }

    #[test]
    fn test_parse_allocations_bad_format() {
        for bad in ["rp=rp1", "VCPU: 2", ""] {
            let groups = vec![bad.to_string()];
            assert_matches!(parse_allocations(&groups), Err(Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_parse_allocations_rejects_negative() {
        let groups = vec!["rp=rp1,VCPU=-1".to_string()];
        assert_matches!(parse_allocations(&groups), Err(Error::InvalidArgument(_)));
    }

    #[test]
    fn test_allocation_body_keeps_zero() {
        let groups = vec!["rp=rp1,VCPU=0,MEMORY_MB=256".to_string()];
        let allocations = parse_allocations(&groups).unwrap();
        let body = allocation_body(&allocations);
        let entry = &body["allocations"][0];
        assert_eq!(entry["resource_provider"]["uuid"], "rp1");
        // Zero is carried explicitly to signal class removal on overwrite.
        assert_eq!(entry["resources"]["VCPU"], 0);
        assert_eq!(entry["resources"]["MEMORY_MB"], 256);
    }

    #[test]
    fn test_allocation_round_trip_tuples() {
        let groups = vec![
            "rp=rp2,DISK_GB=10".to_string(),
            "rp=rp1,VCPU=2,MEMORY_MB=512".to_string(),
        ];
        let allocations = parse_allocations(&groups).unwrap();
        let body = allocation_body(&allocations);

        let mut tuples = vec![];
        for entry in body["allocations"].as_array().unwrap() {
            let rp = entry["resource_provider"]["uuid"].as_str().unwrap();
            for (class, amount) in entry["resources"].as_object().unwrap() {
                tuples.push((rp.to_string(), class.clone(), amount.as_u64().unwrap()));
            }
        }
        tuples.sort();
        assert_eq!(
            tuples,
            vec![
                ("rp1".to_string(), "MEMORY_MB".to_string(), 512),
                ("rp1".to_string(), "VCPU".to_string(), 2),
                ("rp2".to_string(), "DISK_GB".to_string(), 10),
            ]
        );
    }

    #[test]
    fn test_parse_inventory_resource() {
        let (name, field, value) = parse_inventory_resource("VCPU=16").unwrap();
        assert_eq!(name, "VCPU");
        assert_eq!(field, "total");
        assert_eq!(value, InventoryValue::Int(16));

        let (name, field, value) = parse_inventory_resource("MEMORY_MB:step_size=128").unwrap();
        assert_eq!(name, "MEMORY_MB");
        assert_eq!(field, "step_size");
        assert_eq!(value, InventoryValue::Int(128));

        let (_, field, value) = parse_inventory_resource("VCPU:allocation_ratio=16.0").unwrap();
        assert_eq!(field, "allocation_ratio");
        assert_eq!(value, InventoryValue::Float(16.0));
    }

    #[test]
    fn test_parse_inventory_resource_errors() {
        assert_matches!(
            parse_inventory_resource("VCPU"),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            parse_inventory_resource("VCPU:bogus=1"),
            Err(Error::InvalidArgument(msg)) if msg.contains("unknown inventory field")
        );
        assert_matches!(
            parse_inventory_resource("VCPU:a:b=1"),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            parse_inventory_resource("=1"),
            Err(Error::InvalidArgument(_))
        );
    }

    #[test]
    fn test_parse_resource_filter() {
        let (class, amount) = parse_resource_filter("DISK_GB=64").unwrap();
        assert_eq!(class, "DISK_GB");
        assert_eq!(amount, 64);
        assert_matches!(
            parse_resource_filter("DISK_GB"),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            parse_resource_filter("DISK_GB=lots"),
            Err(Error::InvalidArgument(_))
        );
    }

    #[test]
    fn test_validate_custom_name() {
        validate_custom_name("trait", "CUSTOM_GOLD").unwrap();
        validate_custom_name("resource class", "CUSTOM_FPGA_V2").unwrap();
        assert_matches!(
            validate_custom_name("trait", "GOLD"),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            validate_custom_name("trait", "CUSTOM_gold"),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            validate_custom_name("trait", "CUSTOM_A-B"),
            Err(Error::InvalidArgument(_))
        );
    }
}
