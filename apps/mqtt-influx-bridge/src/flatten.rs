//! Nested telemetry values and their collapse into a single-level field map.

use crate::error::DecodeError;
use std::collections::BTreeMap;

/// A scalar that can be stored as an InfluxDB field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
    Boolean(bool),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Flattened field set: composite key to scalar.
pub type FlatFields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum NestedValue {
    Leaf(FieldValue),
    Node(BTreeMap<String, NestedValue>),
}

impl NestedValue {
    /// Converts decoded JSON into a nested value.
    ///
    /// `null` members are dropped (returns `Ok(None)` for a bare `null`) and
    /// arrays are rejected, since neither has a field representation.
    pub fn from_json(value: serde_json::Value) -> Result<Option<Self>, DecodeError> {
        from_json_at(value, "")
    }
}

fn from_json_at(value: serde_json::Value, path: &str) -> Result<Option<NestedValue>, DecodeError> {
    use serde_json::Value;

    let leaf = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => FieldValue::Boolean(b),
        Value::String(s) => FieldValue::String(s),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => match n.as_f64() {
                Some(f) => FieldValue::Float(f),
                None => {
                    return Err(DecodeError::UnsupportedShape {
                        path: path.to_string(),
                        reason: "number not representable as i64 or f64",
                    })
                }
            },
        },
        Value::Array(_) => {
            return Err(DecodeError::UnsupportedShape {
                path: path.to_string(),
                reason: "arrays cannot be stored as fields",
            })
        }
        Value::Object(map) => {
            let mut children = BTreeMap::new();
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                if let Some(child) = from_json_at(child, &child_path)? {
                    children.insert(key, child);
                }
            }
            return Ok(Some(NestedValue::Node(children)));
        }
    };
    Ok(Some(NestedValue::Leaf(leaf)))
}

/// Collapses `node` into one entry per leaf, keyed by the leaf's path joined
/// with `separator`.
///
/// A bare leaf comes back under the empty key; callers that accept scalar
/// payloads must wrap them under a key of their own first. When two paths
/// join to the same key the one visited last (in key order) wins.
pub fn flatten(node: &NestedValue, separator: &str) -> FlatFields {
    let mut out = FlatFields::new();
    flatten_into(node, "", separator, &mut out);
    out
}

fn flatten_into(node: &NestedValue, prefix: &str, separator: &str, out: &mut FlatFields) {
    match node {
        NestedValue::Leaf(value) => {
            out.insert(prefix.to_string(), value.clone());
        }
        NestedValue::Node(children) => {
            for (key, child) in children {
                let composite = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{separator}{key}")
                };
                flatten_into(child, &composite, separator, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested(value: serde_json::Value) -> NestedValue {
        NestedValue::from_json(value).unwrap().unwrap()
    }

    #[test]
    fn flat_input_is_unchanged() {
        let fields = flatten(&nested(json!({"a": 1, "b": 2})), "_");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["a"], FieldValue::Integer(1));
        assert_eq!(fields["b"], FieldValue::Integer(2));
    }

    #[test]
    fn nested_keys_are_joined_with_separator() {
        let fields = flatten(&nested(json!({"Wifi": {"RSSI": 74, "Signal": -63}})), "_");
        let expected: FlatFields = [
            ("Wifi_RSSI".to_string(), FieldValue::Integer(74)),
            ("Wifi_Signal".to_string(), FieldValue::Integer(-63)),
        ]
        .into_iter()
        .collect();
        assert_eq!(fields, expected);
    }

    #[test]
    fn deep_leaf_keeps_full_path_and_value() {
        for depth in 1..=12 {
            let keys: Vec<String> = (1..=depth).map(|i| format!("k{i}")).collect();
            let mut node = NestedValue::Leaf(FieldValue::Float(1.5));
            for key in keys.iter().rev() {
                node = NestedValue::Node([(key.clone(), node)].into_iter().collect());
            }
            let fields = flatten(&node, "_");
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[&keys.join("_")], FieldValue::Float(1.5));
        }
    }

    #[test]
    fn bare_leaf_uses_empty_key() {
        let fields = flatten(&NestedValue::Leaf(FieldValue::Boolean(true)), "_");
        assert_eq!(fields.get(""), Some(&FieldValue::Boolean(true)));
    }

    #[test]
    fn custom_separator_is_used() {
        let fields = flatten(&nested(json!({"ENERGY": {"Power": 0}})), ".");
        assert_eq!(fields["ENERGY.Power"], FieldValue::Integer(0));
    }

    #[test]
    fn colliding_paths_last_key_wins() {
        // "a_b" sorts after "a", so the top-level leaf is visited last.
        let fields = flatten(&nested(json!({"a": {"b": 1}, "a_b": 2})), "_");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["a_b"], FieldValue::Integer(2));
    }

    #[test]
    fn json_scalars_map_to_field_types() {
        let fields = flatten(
            &nested(json!({
                "Total": 3.837,
                "Factor": 0.00,
                "UptimeSec": 154892,
                "POWER": "ON",
                "ok": false,
                "big": 18446744073709551615u64
            })),
            "_",
        );
        assert_eq!(fields["Total"], FieldValue::Float(3.837));
        assert_eq!(fields["Factor"], FieldValue::Float(0.0));
        assert_eq!(fields["UptimeSec"], FieldValue::Integer(154892));
        assert_eq!(fields["POWER"], FieldValue::from("ON"));
        assert_eq!(fields["ok"], FieldValue::Boolean(false));
        assert!(matches!(fields["big"], FieldValue::Float(_)));
    }

    #[test]
    fn null_members_are_dropped() {
        let fields = flatten(&nested(json!({"a": null, "b": {"c": null, "d": 1}})), "_");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["b_d"], FieldValue::Integer(1));
        assert!(NestedValue::from_json(json!(null)).unwrap().is_none());
    }

    #[test]
    fn arrays_are_rejected_with_path() {
        let err = NestedValue::from_json(json!({"ENERGY": {"Power": [1, 2]}})).unwrap_err();
        match err {
            DecodeError::UnsupportedShape { path, .. } => assert_eq!(path, "ENERGY.Power"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
