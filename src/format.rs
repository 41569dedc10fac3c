//! Response formatting
//!
//! Maps JSON response payloads into ordered column/row structures. Each
//! command declares its shape up front as a `ShapeSpec`, so the columns are
//! stable across calls regardless of which keys the server happens to return.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// Shape Descriptors
// =============================================================================

/// Declared shape of a command's response payload
#[derive(Debug, Clone, Copy)]
pub enum ShapeSpec {
    /// A single object rendered as one row
    Scalar { fields: &'static [&'static str] },
    /// An array of objects, one row each, in input order
    ListOf { fields: &'static [&'static str] },
    /// An object of key to sub-object, one row per key, sorted by key
    KeyedMap {
        key_column: &'static str,
        fields: &'static [&'static str],
    },
}

// =============================================================================
// Tabular Result
// =============================================================================

/// Ordered columns and display-ready rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Format a JSON payload according to the command's declared shape.
pub fn format(payload: &Value, shape: &ShapeSpec) -> Result<TabularResult> {
    match shape {
        ShapeSpec::Scalar { fields } => format_scalar(payload, fields),
        ShapeSpec::ListOf { fields } => format_list(payload, fields),
        ShapeSpec::KeyedMap { key_column, fields } => format_keyed_map(payload, key_column, fields),
    }
}

fn format_scalar(payload: &Value, fields: &[&str]) -> Result<TabularResult> {
    let object = payload
        .as_object()
        .ok_or_else(|| Error::malformed("expected a JSON object"))?;
    let mut result = TabularResult::new(fields.iter().map(|f| f.to_string()).collect());
    result.push_row(
        fields
            .iter()
            .map(|f| display_value(object.get(*f)))
            .collect(),
    );
    Ok(result)
}

fn format_list(payload: &Value, fields: &[&str]) -> Result<TabularResult> {
    let items = payload
        .as_array()
        .ok_or_else(|| Error::malformed("expected a JSON array"))?;
    let mut result = TabularResult::new(fields.iter().map(|f| f.to_string()).collect());
    for item in items {
        let object = item
            .as_object()
            .ok_or_else(|| Error::malformed("expected an array of JSON objects"))?;
        result.push_row(
            fields
                .iter()
                .map(|f| display_value(object.get(*f)))
                .collect(),
        );
    }
    Ok(result)
}

fn format_keyed_map(payload: &Value, key_column: &str, fields: &[&str]) -> Result<TabularResult> {
    let map = payload
        .as_object()
        .ok_or_else(|| Error::malformed("expected a JSON object keyed by name"))?;

    // BTreeMap gives sorted-by-key row order independent of input ordering.
    let sorted: BTreeMap<&String, &Value> = map.iter().collect();

    let mut columns = Vec::with_capacity(fields.len() + 1);
    columns.push(key_column.to_string());
    columns.extend(fields.iter().map(|f| f.to_string()));
    let mut result = TabularResult::new(columns);

    for (key, value) in sorted {
        let mut row = Vec::with_capacity(fields.len() + 1);
        row.push(key.clone());
        match value {
            Value::Object(object) => {
                row.extend(fields.iter().map(|f| display_value(object.get(*f))));
            }
            // A keyed map of scalars (e.g. usages) maps the single declared
            // field onto the value itself.
            other if fields.len() == 1 => row.push(display_value(Some(other))),
            _ => {
                return Err(Error::malformed(format!(
                    "expected an object value for key {key:?}"
                )))
            }
        }
        result.push_row(row);
    }
    Ok(result)
}

/// Render a single cell.
///
/// Strings print verbatim, scalars via their JSON form, absent and null
/// values as empty. Nested structures stay a single compact-JSON cell; the
/// shape spec decides whether they get flattened further upstream.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(nested) => serde_json::to_string(nested).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_scalar_shape() {
        let payload = json!({"uuid": "u1", "name": "compute-0", "generation": 3});
        let shape = ShapeSpec::Scalar {
            fields: &["uuid", "name", "generation"],
        };
        let result = format(&payload, &shape).unwrap();
        assert_eq!(result.columns, vec!["uuid", "name", "generation"]);
        assert_eq!(result.rows, vec![vec!["u1", "compute-0", "3"]]);
    }

    #[test]
    fn test_scalar_missing_fields_empty() {
        let payload = json!({"uuid": "u1"});
        let shape = ShapeSpec::Scalar {
            fields: &["uuid", "name"],
        };
        let result = format(&payload, &shape).unwrap();
        assert_eq!(result.rows, vec![vec!["u1".to_string(), String::new()]]);
    }

    #[test]
    fn test_list_shape_no_column_drift() {
        // Item 1 has {a,b}, item 2 has {a,c}; declared shape {a,b,c} wins.
        let payload = json!([
            {"a": 1, "b": 2},
            {"a": 3, "c": 4},
        ]);
        let shape = ShapeSpec::ListOf {
            fields: &["a", "b", "c"],
        };
        let result = format(&payload, &shape).unwrap();
        assert_eq!(result.columns, vec!["a", "b", "c"]);
        assert_eq!(
            result.rows,
            vec![
                vec!["1".to_string(), "2".to_string(), String::new()],
                vec!["3".to_string(), String::new(), "4".to_string()],
            ]
        );
    }

    #[test]
    fn test_list_shape_preserves_input_order() {
        let payload = json!([{"name": "zeta"}, {"name": "alpha"}]);
        let shape = ShapeSpec::ListOf { fields: &["name"] };
        let result = format(&payload, &shape).unwrap();
        assert_eq!(result.rows, vec![vec!["zeta"], vec!["alpha"]]);
    }

    #[test]
    fn test_keyed_map_sorted_and_idempotent() {
        let shape = ShapeSpec::KeyedMap {
            key_column: "resource_provider",
            fields: &["generation", "resources"],
        };
        let forward = json!({
            "rp-b": {"generation": 2, "resources": {"VCPU": 1}},
            "rp-a": {"generation": 5, "resources": {"DISK_GB": 9}},
        });
        let reordered = json!({
            "rp-a": {"generation": 5, "resources": {"DISK_GB": 9}},
            "rp-b": {"generation": 2, "resources": {"VCPU": 1}},
        });

        let first = format(&forward, &shape).unwrap();
        let second = format(&reordered, &shape).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.rows[0][0], "rp-a");
        assert_eq!(first.rows[1][0], "rp-b");
        // Nested resources render as a single compact JSON cell.
        assert_eq!(first.rows[0][2], "{\"DISK_GB\":9}");
    }

    #[test]
    fn test_keyed_map_of_scalars() {
        let shape = ShapeSpec::KeyedMap {
            key_column: "resource_class",
            fields: &["usage"],
        };
        let payload = json!({"VCPU": 2, "MEMORY_MB": 512});
        let result = format(&payload, &shape).unwrap();
        assert_eq!(result.columns, vec!["resource_class", "usage"]);
        assert_eq!(
            result.rows,
            vec![vec!["MEMORY_MB", "512"], vec!["VCPU", "2"]]
        );
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let shape = ShapeSpec::ListOf { fields: &["name"] };
        assert_matches!(
            format(&json!({"name": "x"}), &shape),
            Err(Error::MalformedResponse(_))
        );

        let shape = ShapeSpec::Scalar { fields: &["name"] };
        assert_matches!(format(&json!([1, 2]), &shape), Err(Error::MalformedResponse(_)));

        let shape = ShapeSpec::KeyedMap {
            key_column: "k",
            fields: &["a", "b"],
        };
        assert_matches!(
            format(&json!({"k1": 7}), &shape),
            Err(Error::MalformedResponse(_))
        );
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(None), "");
        assert_eq!(display_value(Some(&Value::Null)), "");
        assert_eq!(display_value(Some(&json!("plain"))), "plain");
        assert_eq!(display_value(Some(&json!(16.0))), "16.0");
        assert_eq!(display_value(Some(&json!(true))), "true");
        assert_eq!(display_value(Some(&json!(["a", "b"]))), "[\"a\",\"b\"]");
    }
}
