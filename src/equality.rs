//! Structural equality and enum intersection.

use serde_json::Value;

use crate::error::ComposeError;
use crate::types::SchemaType;

/// Structural equality over literal values.
///
/// Objects compare by key set and then value, so key order is irrelevant.
/// Numbers compare by value, so `1` equals `1.0`.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| deep_equal(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, l)| right.get(key).is_some_and(|r| deep_equal(l, r)))
        }
        (Value::Number(left), Value::Number(right)) => {
            left == right || matches!((left.as_f64(), right.as_f64()), (Some(l), Some(r)) if l == r)
        }
        _ => a == b,
    }
}

/// Intersect two enums.
///
/// - Neither side declares one: `None`.
/// - One side declares one: that side's list, unchanged.
/// - Both do: the members of `first` structurally equal to some member of
///   `second`, in `first`'s order. Duplicates in `first` survive.
///
/// A declared but empty list counts as undeclared. When `literal_type` is
/// given, every surviving member must be an instance of it.
///
/// # Errors
///
/// `EmptyEnumIntersection` if both sides declare values and none are shared;
/// `EnumLiteralType` if a surviving member has the wrong type.
pub fn merge_enum(
    first: Option<&[Value]>,
    second: Option<&[Value]>,
    literal_type: Option<SchemaType>,
) -> Result<Option<Vec<Value>>, ComposeError> {
    let first = first.filter(|values| !values.is_empty());
    let second = second.filter(|values| !values.is_empty());

    let merged = match (first, second) {
        (None, None) => return Ok(None),
        (Some(only), None) | (None, Some(only)) => only.to_vec(),
        (Some(first), Some(second)) => {
            let shared: Vec<Value> = first
                .iter()
                .filter(|value| second.iter().any(|other| deep_equal(value, other)))
                .cloned()
                .collect();
            if shared.is_empty() {
                return Err(ComposeError::EmptyEnumIntersection {
                    first: first.to_vec(),
                    second: second.to_vec(),
                });
            }
            shared
        }
    };

    if let Some(expected) = literal_type {
        if let Some(value) = merged.iter().find(|v| !expected.accepts_literal(v)) {
            return Err(ComposeError::EnumLiteralType {
                value: value.clone(),
                expected,
            });
        }
    }

    Ok(Some(merged))
}
