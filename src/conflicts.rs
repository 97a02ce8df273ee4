//! Conflict checks run on every pair of schemas before they are merged.
//!
//! Each check looks at the two nodes as declared (references are not
//! followed) and fails with a specific error naming both values. All checks
//! are symmetric: `check(a, b)` fails iff `check(b, a)` fails.

use serde_json::{Number, Value};

use crate::equality::deep_equal;
use crate::error::ComposeError;
use crate::types::Schema;

/// Run every conflict check.
pub fn check_conflicts(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    check_type_conflicts(first, second)?;
    check_format_conflicts(first, second)?;
    check_enum_conflicts(first, second)?;
    check_read_write_conflicts(first, second)?;
    check_range_conflicts(first, second)?;
    check_item_type_conflicts(first, second)
}

pub fn check_type_conflicts(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    match (first.schema_type, second.schema_type) {
        (Some(a), Some(b)) if a != b => Err(ComposeError::TypeConflict {
            first: a,
            second: b,
        }),
        _ => Ok(()),
    }
}

pub fn check_format_conflicts(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    match (&first.format, &second.format) {
        (Some(a), Some(b)) if a != b => Err(ComposeError::FormatConflict {
            first: a.clone(),
            second: b.clone(),
        }),
        _ => Ok(()),
    }
}

pub fn check_enum_conflicts(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    let (Some(a), Some(b)) = (&first.enum_values, &second.enum_values) else {
        return Ok(());
    };
    if a.is_empty() || b.is_empty() {
        return Ok(());
    }

    let overlaps = a.iter().any(|x| b.iter().any(|y| deep_equal(x, y)));
    if overlaps {
        Ok(())
    } else {
        Err(ComposeError::EmptyEnumIntersection {
            first: a.clone(),
            second: b.clone(),
        })
    }
}

pub fn check_read_write_conflicts(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    let flag = |value: Option<bool>| value.unwrap_or(false);
    if (flag(first.read_only) && flag(second.write_only))
        || (flag(first.write_only) && flag(second.read_only))
    {
        return Err(ComposeError::ReadWriteConflict);
    }
    Ok(())
}

/// Fails when two numeric schemas declare disjoint `[minimum, maximum]`
/// intervals. Open bounds default to infinity; exclusivity is not considered.
pub fn check_range_conflicts(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    let numeric = |schema: &Schema| schema.schema_type.is_some_and(|ty| ty.is_numeric());
    if !numeric(first) || !numeric(second) {
        return Ok(());
    }

    let (a_min, a_max) = interval(first);
    let (b_min, b_max) = interval(second);
    if a_min.max(b_min) > a_max.min(b_max) {
        return Err(ComposeError::RangeConflict {
            first: render_interval(a_min, a_max),
            second: render_interval(b_min, b_max),
        });
    }
    Ok(())
}

pub fn check_item_type_conflicts(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    let item_type = |schema: &Schema| -> Option<String> {
        schema
            .items
            .as_ref()?
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    match (item_type(first), item_type(second)) {
        (Some(a), Some(b)) if a != b => Err(ComposeError::ItemTypeConflict {
            first: a,
            second: b,
        }),
        _ => Ok(()),
    }
}

/// Reject keywords this component does not compose.
pub fn check_unsupported(first: &Schema, second: &Schema) -> Result<(), ComposeError> {
    if first.not.is_some() || second.not.is_some() {
        return Err(ComposeError::UnsupportedKeyword { keyword: "not" });
    }
    if first.pattern_properties.is_some() || second.pattern_properties.is_some() {
        return Err(ComposeError::UnsupportedKeyword {
            keyword: "patternProperties",
        });
    }
    Ok(())
}

pub(crate) fn as_f64(number: &Number) -> f64 {
    // Every serde_json number without arbitrary_precision has an f64 view.
    number.as_f64().unwrap_or(f64::NAN)
}

fn interval(schema: &Schema) -> (f64, f64) {
    let min = schema.minimum.as_ref().map_or(f64::NEG_INFINITY, as_f64);
    let max = schema.maximum.as_ref().map_or(f64::INFINITY, as_f64);
    (min, max)
}

pub(crate) fn render_bounds(schema: &Schema) -> String {
    let (min, max) = interval(schema);
    render_interval(min, max)
}

fn render_interval(min: f64, max: f64) -> String {
    let bound = |v: f64| match v {
        f64::NEG_INFINITY => "-inf".to_string(),
        f64::INFINITY => "inf".to_string(),
        _ => v.to_string(),
    };
    format!("[{}, {}]", bound(min), bound(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> Schema {
        Schema::from_value(&value).unwrap()
    }

    /// Asserts a checker gives the same verdict in both argument orders.
    fn symmetric(
        check: fn(&Schema, &Schema) -> Result<(), ComposeError>,
        a: &Schema,
        b: &Schema,
    ) -> bool {
        let forward = check(a, b).is_err();
        let backward = check(b, a).is_err();
        assert_eq!(forward, backward, "checker is not symmetric");
        forward
    }

    #[test]
    fn type_conflict() {
        let a = schema(json!({ "type": "string" }));
        let b = schema(json!({ "type": "integer" }));
        let untyped = schema(json!({ "nullable": true }));

        assert!(symmetric(check_type_conflicts, &a, &b));
        assert!(!symmetric(check_type_conflicts, &a, &a));
        assert!(!symmetric(check_type_conflicts, &a, &untyped));
    }

    #[test]
    fn format_conflict() {
        let a = schema(json!({ "type": "string", "format": "date" }));
        let b = schema(json!({ "type": "string", "format": "date-time" }));
        let none = schema(json!({ "type": "string" }));

        assert!(symmetric(check_format_conflicts, &a, &b));
        assert!(!symmetric(check_format_conflicts, &a, &none));

        let err = check_format_conflicts(&a, &b).unwrap_err();
        assert!(err.to_string().contains("\"date\""));
        assert!(err.to_string().contains("\"date-time\""));
    }

    #[test]
    fn enum_conflict() {
        let a = schema(json!({ "type": "string", "enum": ["A", "B"] }));
        let b = schema(json!({ "type": "string", "enum": ["C", "D"] }));
        let c = schema(json!({ "type": "string", "enum": ["B", "C"] }));

        assert!(symmetric(check_enum_conflicts, &a, &b));
        assert!(!symmetric(check_enum_conflicts, &a, &c));
        assert!(!symmetric(check_enum_conflicts, &b, &c));
    }

    #[test]
    fn read_write_conflict() {
        let read = schema(json!({ "readOnly": true }));
        let write = schema(json!({ "writeOnly": true }));
        let both_off = schema(json!({ "readOnly": false, "writeOnly": false }));

        assert!(symmetric(check_read_write_conflicts, &read, &write));
        assert!(!symmetric(check_read_write_conflicts, &read, &read));
        assert!(!symmetric(check_read_write_conflicts, &read, &both_off));
    }

    #[test]
    fn range_conflict() {
        let low = schema(json!({ "type": "integer", "minimum": 0, "maximum": 10 }));
        let high = schema(json!({ "type": "integer", "minimum": 11 }));
        let touching = schema(json!({ "type": "integer", "minimum": 10, "maximum": 20 }));
        let open = schema(json!({ "type": "number" }));

        assert!(symmetric(check_range_conflicts, &low, &high));
        assert!(!symmetric(check_range_conflicts, &low, &touching));
        assert!(!symmetric(check_range_conflicts, &low, &open));

        let err = check_range_conflicts(&low, &high).unwrap_err();
        assert_eq!(
            err.to_string(),
            "numeric range conflict: [0, 10] does not overlap [11, inf]"
        );
    }

    #[test]
    fn range_conflict_ignores_non_numeric() {
        let a = schema(json!({ "minimum": 0, "maximum": 1 }));
        let b = schema(json!({ "minimum": 5 }));
        assert!(!symmetric(check_range_conflicts, &a, &b));
    }

    #[test]
    fn item_type_conflict() {
        let strings = schema(json!({ "type": "array", "items": { "type": "string" } }));
        let ints = schema(json!({ "type": "array", "items": { "type": "integer" } }));
        let refs = schema(json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Pet" }
        }));

        assert!(symmetric(check_item_type_conflicts, &strings, &ints));
        assert!(!symmetric(check_item_type_conflicts, &strings, &refs));
    }

    #[test]
    fn unsupported_not() {
        let a = schema(json!({ "not": { "type": "string" } }));
        let b = schema(json!({ "type": "string" }));
        assert!(matches!(
            check_unsupported(&b, &a),
            Err(ComposeError::UnsupportedKeyword { keyword: "not" })
        ));
    }
}
