//! Type-specific merging of two composition-free schemas.
//!
//! Every merger runs the conflict checks, rejects unsupported keywords,
//! applies its own constraint rules, then intersects `enum` and merges
//! metadata. On metadata the second schema wins when both define a field.

use serde_json::{Map, Number};

use crate::conflicts::{as_f64, check_conflicts, check_unsupported, render_bounds};
use crate::equality::merge_enum;
use crate::error::ComposeError;
use crate::merge::{merge_schemas_or_refs, RefResolver};
use crate::types::{AdditionalProperties, Schema, SchemaType};

/// Merge two schemas, dispatching on their declared type.
///
/// Neither side may carry `$ref` or composition keywords; those are handled
/// by [`merge_schemas_or_refs`].
pub fn merge_schemas<R>(
    first: &Schema,
    second: &Schema,
    resolver: &R,
) -> Result<Schema, ComposeError>
where
    R: RefResolver + ?Sized,
{
    match second.schema_type.or(first.schema_type) {
        Some(SchemaType::Object) => merge_object_schemas(first, second, resolver),
        Some(SchemaType::Array) => merge_array_schemas(first, second, resolver),
        Some(SchemaType::String) => merge_string_schemas(first, second),
        Some(SchemaType::Number) => merge_numeric_schemas(first, second, SchemaType::Number),
        Some(SchemaType::Integer) => merge_numeric_schemas(first, second, SchemaType::Integer),
        Some(SchemaType::Boolean) => merge_boolean_schemas(first, second),
        None => merge_untyped_schemas(first, second, resolver),
    }
}

pub fn merge_object_schemas<R>(
    first: &Schema,
    second: &Schema,
    resolver: &R,
) -> Result<Schema, ComposeError>
where
    R: RefResolver + ?Sized,
{
    merge_with(first, second, Some(SchemaType::Object), |merged| {
        object_constraints(first, second, resolver, merged)
    })
}

/// # Errors
///
/// `MissingItems` if neither side declares `items`.
pub fn merge_array_schemas<R>(
    first: &Schema,
    second: &Schema,
    resolver: &R,
) -> Result<Schema, ComposeError>
where
    R: RefResolver + ?Sized,
{
    merge_with(first, second, Some(SchemaType::Array), |merged| {
        array_constraints(first, second, resolver, merged, true)
    })
}

/// Patterns are compared, never intersected: two different patterns conflict.
pub fn merge_string_schemas(first: &Schema, second: &Schema) -> Result<Schema, ComposeError> {
    merge_with(first, second, Some(SchemaType::String), |merged| {
        string_constraints(first, second, merged)
    })
}

/// # Errors
///
/// `RangeConflict` if the merged `minimum` exceeds the merged `maximum`,
/// including when only one side declares a type.
pub fn merge_numeric_schemas(
    first: &Schema,
    second: &Schema,
    schema_type: SchemaType,
) -> Result<Schema, ComposeError> {
    merge_with(first, second, Some(schema_type), |merged| {
        numeric_constraints(first, second, merged)?;
        if let (Some(min), Some(max)) = (&merged.minimum, &merged.maximum) {
            if as_f64(min) > as_f64(max) {
                return Err(ComposeError::RangeConflict {
                    first: render_bounds(first),
                    second: render_bounds(second),
                });
            }
        }
        Ok(())
    })
}

pub fn merge_boolean_schemas(first: &Schema, second: &Schema) -> Result<Schema, ComposeError> {
    merge_with(first, second, Some(SchemaType::Boolean), |_| Ok(()))
}

/// Merge two schemas with no declared type.
///
/// Applies every constraint family without asserting a type.
pub fn merge_untyped_schemas<R>(
    first: &Schema,
    second: &Schema,
    resolver: &R,
) -> Result<Schema, ComposeError>
where
    R: RefResolver + ?Sized,
{
    merge_with(first, second, None, |merged| {
        object_constraints(first, second, resolver, merged)?;
        array_constraints(first, second, resolver, merged, false)?;
        string_constraints(first, second, merged)?;
        numeric_constraints(first, second, merged)
    })
}

fn merge_with<F>(
    first: &Schema,
    second: &Schema,
    schema_type: Option<SchemaType>,
    constraints: F,
) -> Result<Schema, ComposeError>
where
    F: FnOnce(&mut Schema) -> Result<(), ComposeError>,
{
    check_conflicts(first, second)?;
    check_unsupported(first, second)?;

    let mut merged = Schema {
        schema_type,
        ..Schema::default()
    };
    constraints(&mut merged)?;
    merged.enum_values = merge_enum(
        first.enum_values.as_deref(),
        second.enum_values.as_deref(),
        schema_type,
    )?;
    merge_metadata(first, second, &mut merged);
    Ok(merged)
}

fn object_constraints<R>(
    first: &Schema,
    second: &Schema,
    resolver: &R,
    merged: &mut Schema,
) -> Result<(), ComposeError>
where
    R: RefResolver + ?Sized,
{
    merged.properties = match (&first.properties, &second.properties) {
        (Some(a), Some(b)) => {
            let mut properties = Map::new();
            for (name, schema) in a {
                let value = match b.get(name) {
                    Some(other) => merge_schemas_or_refs(schema, other, resolver)?,
                    None => schema.clone(),
                };
                properties.insert(name.clone(), value);
            }
            for (name, schema) in b {
                if !a.contains_key(name) {
                    properties.insert(name.clone(), schema.clone());
                }
            }
            Some(properties)
        }
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    };

    merged.required = match (&first.required, &second.required) {
        (None, None) => None,
        (a, b) => {
            let mut required: Vec<String> = Vec::new();
            for name in a.iter().chain(b.iter()).flatten() {
                if !required.contains(name) {
                    required.push(name.clone());
                }
            }
            Some(required)
        }
    };

    merged.additional_properties =
        match (&first.additional_properties, &second.additional_properties) {
            (Some(AdditionalProperties::Schema(a)), Some(AdditionalProperties::Schema(b))) => Some(
                AdditionalProperties::Schema(merge_schemas_or_refs(a, b, resolver)?),
            ),
            (a, b) => b.as_ref().or(a.as_ref()).cloned(),
        };

    merged.min_properties = larger(first.min_properties, second.min_properties);
    merged.max_properties = smaller(first.max_properties, second.max_properties);
    Ok(())
}

fn array_constraints<R>(
    first: &Schema,
    second: &Schema,
    resolver: &R,
    merged: &mut Schema,
    require_items: bool,
) -> Result<(), ComposeError>
where
    R: RefResolver + ?Sized,
{
    merged.items = match (&first.items, &second.items) {
        (Some(a), Some(b)) => Some(merge_schemas_or_refs(a, b, resolver)?),
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) if require_items => return Err(ComposeError::MissingItems),
        (None, None) => None,
    };

    merged.min_items = larger(first.min_items, second.min_items);
    merged.max_items = smaller(first.max_items, second.max_items);
    merged.unique_items = match (first.unique_items, second.unique_items) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(false) || b.unwrap_or(false)),
    };
    Ok(())
}

fn string_constraints(
    first: &Schema,
    second: &Schema,
    merged: &mut Schema,
) -> Result<(), ComposeError> {
    merged.min_length = larger(first.min_length, second.min_length);
    merged.max_length = smaller(first.max_length, second.max_length);
    merged.pattern = match (&first.pattern, &second.pattern) {
        (Some(a), Some(b)) if a != b => {
            return Err(ComposeError::PatternConflict {
                first: a.clone(),
                second: b.clone(),
            })
        }
        (a, b) => b.as_ref().or(a.as_ref()).cloned(),
    };
    Ok(())
}

// The merged bound is exclusive when either declared bound is, even if the
// tighter value came from the inclusive side.
fn numeric_constraints(
    first: &Schema,
    second: &Schema,
    merged: &mut Schema,
) -> Result<(), ComposeError> {
    merged.minimum = tighter(first.minimum.as_ref(), second.minimum.as_ref(), |a, b| b > a);
    merged.exclusive_minimum = exclusivity(
        first.minimum.is_some() && first.exclusive_minimum == Some(true),
        second.minimum.is_some() && second.exclusive_minimum == Some(true),
        first.exclusive_minimum,
        second.exclusive_minimum,
    );

    merged.maximum = tighter(first.maximum.as_ref(), second.maximum.as_ref(), |a, b| b < a);
    merged.exclusive_maximum = exclusivity(
        first.maximum.is_some() && first.exclusive_maximum == Some(true),
        second.maximum.is_some() && second.exclusive_maximum == Some(true),
        first.exclusive_maximum,
        second.exclusive_maximum,
    );

    // Product, not least common multiple: 4 and 6 give 24.
    merged.multiple_of = match (&first.multiple_of, &second.multiple_of) {
        (Some(a), Some(b)) => {
            let product = multiply(a, b).ok_or_else(|| ComposeError::InvalidSchema {
                message: format!("multipleOf product of {} and {} is not finite", a, b),
            })?;
            Some(product)
        }
        (a, b) => b.as_ref().or(a.as_ref()).cloned(),
    };
    Ok(())
}

fn merge_metadata(first: &Schema, second: &Schema, merged: &mut Schema) {
    merged.title = pick(&first.title, &second.title);
    merged.description = pick(&first.description, &second.description);
    merged.format = pick(&first.format, &second.format);
    merged.nullable = pick(&first.nullable, &second.nullable);
    merged.read_only = pick(&first.read_only, &second.read_only);
    merged.write_only = pick(&first.write_only, &second.write_only);
    merged.deprecated = pick(&first.deprecated, &second.deprecated);
    merged.default = pick(&first.default, &second.default);
    merged.example = pick(&first.example, &second.example);
    merged.external_docs = pick(&first.external_docs, &second.external_docs);
    merged.discriminator = pick(&first.discriminator, &second.discriminator);

    let mut extensions = first.extensions.clone();
    for (key, value) in &second.extensions {
        extensions.insert(key.clone(), value.clone());
    }
    merged.extensions = extensions;
}

fn pick<T: Clone>(first: &Option<T>, second: &Option<T>) -> Option<T> {
    second.as_ref().or(first.as_ref()).cloned()
}

fn larger(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn smaller(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Picks `b` over `a` when `prefer_second(a, b)` holds.
fn tighter(
    a: Option<&Number>,
    b: Option<&Number>,
    prefer_second: fn(f64, f64) -> bool,
) -> Option<Number> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if prefer_second(as_f64(a), as_f64(b)) {
                Some(b.clone())
            } else {
                Some(a.clone())
            }
        }
        (a, b) => a.or(b).cloned(),
    }
}

fn exclusivity(
    first_exclusive: bool,
    second_exclusive: bool,
    first: Option<bool>,
    second: Option<bool>,
) -> Option<bool> {
    if first_exclusive || second_exclusive {
        Some(true)
    } else {
        second.or(first)
    }
}

fn multiply(a: &Number, b: &Number) -> Option<Number> {
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        if let Some(product) = x.checked_mul(y) {
            return Some(product.into());
        }
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(product) = x.checked_mul(y) {
            return Some(product.into());
        }
    }
    Number::from_f64(as_f64(a) * as_f64(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn schema(value: Value) -> Schema {
        Schema::from_value(&value).unwrap()
    }

    fn no_refs(pointer: &str) -> Result<Value, ComposeError> {
        Err(ComposeError::UnresolvedReference {
            pointer: pointer.to_string(),
        })
    }

    fn merged(first: Value, second: Value) -> Result<Value, ComposeError> {
        merge_schemas(&schema(first), &schema(second), &no_refs)?.into_value()
    }

    #[test]
    fn second_wins_on_metadata() {
        let result = merged(
            json!({ "type": "string", "title": "A", "description": "first", "example": "x" }),
            json!({ "type": "string", "description": "second", "deprecated": true }),
        )
        .unwrap();

        assert_eq!(
            result,
            json!({
                "type": "string",
                "title": "A",
                "description": "second",
                "deprecated": true,
                "example": "x"
            })
        );
    }

    #[test]
    fn untyped_side_takes_other_type() {
        let result = merged(json!({ "nullable": true }), json!({ "type": "string" })).unwrap();
        assert_eq!(result, json!({ "type": "string", "nullable": true }));
    }

    #[test]
    fn object_properties_deep_union() {
        let result = merged(
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "age": { "type": "integer", "minimum": 0 }
                },
                "required": ["name"]
            }),
            json!({
                "type": "object",
                "properties": {
                    "age": { "type": "integer", "maximum": 150 },
                    "email": { "type": "string" }
                },
                "required": ["email", "name"]
            }),
        )
        .unwrap();

        assert_eq!(
            result["properties"],
            json!({
                "name": { "type": "string" },
                "age": { "type": "integer", "minimum": 0, "maximum": 150 },
                "email": { "type": "string" }
            })
        );
        assert_eq!(result["required"], json!(["name", "email"]));
    }

    #[test]
    fn object_property_conflict_propagates() {
        let result = merged(
            json!({ "type": "object", "properties": { "id": { "type": "string" } } }),
            json!({ "type": "object", "properties": { "id": { "type": "integer" } } }),
        );
        assert!(matches!(result, Err(ComposeError::TypeConflict { .. })));
    }

    #[test]
    fn object_property_counts() {
        let result = merged(
            json!({ "type": "object", "minProperties": 1, "maxProperties": 10 }),
            json!({ "type": "object", "minProperties": 3, "maxProperties": 5 }),
        )
        .unwrap();
        assert_eq!(result["minProperties"], json!(3));
        assert_eq!(result["maxProperties"], json!(5));
    }

    #[test]
    fn additional_properties_rules() {
        let both_schemas = merged(
            json!({
                "type": "object",
                "additionalProperties": { "type": "string", "minLength": 1 }
            }),
            json!({
                "type": "object",
                "additionalProperties": { "type": "string", "maxLength": 8 }
            }),
        )
        .unwrap();
        assert_eq!(
            both_schemas["additionalProperties"],
            json!({ "type": "string", "minLength": 1, "maxLength": 8 })
        );

        let second_wins = merged(
            json!({ "type": "object", "additionalProperties": { "type": "string" } }),
            json!({ "type": "object", "additionalProperties": false }),
        )
        .unwrap();
        assert_eq!(second_wins["additionalProperties"], json!(false));

        let fallback = merged(
            json!({ "type": "object", "additionalProperties": true }),
            json!({ "type": "object" }),
        )
        .unwrap();
        assert_eq!(fallback["additionalProperties"], json!(true));
    }

    #[test]
    fn array_requires_items() {
        let result = merged(json!({ "type": "array" }), json!({ "type": "array", "minItems": 1 }));
        assert!(matches!(result, Err(ComposeError::MissingItems)));
    }

    #[test]
    fn array_constraints_merge() {
        let result = merged(
            json!({
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1,
                "maxItems": 10
            }),
            json!({ "type": "array", "minItems": 2, "maxItems": 20, "uniqueItems": true }),
        )
        .unwrap();

        assert_eq!(
            result,
            json!({
                "type": "array",
                "items": { "type": "string" },
                "minItems": 2,
                "maxItems": 10,
                "uniqueItems": true
            })
        );
    }

    #[test]
    fn array_items_merge_recursively() {
        let result = merged(
            json!({ "type": "array", "items": { "type": "string", "minLength": 2 } }),
            json!({ "type": "array", "items": { "type": "string", "format": "email" } }),
        )
        .unwrap();
        assert_eq!(
            result["items"],
            json!({ "type": "string", "format": "email", "minLength": 2 })
        );
    }

    #[test]
    fn string_lengths_and_pattern() {
        let result = merged(
            json!({ "type": "string", "minLength": 2, "maxLength": 64, "pattern": "^[a-z]+$" }),
            json!({ "type": "string", "minLength": 4, "pattern": "^[a-z]+$" }),
        )
        .unwrap();
        assert_eq!(
            result,
            json!({ "type": "string", "minLength": 4, "maxLength": 64, "pattern": "^[a-z]+$" })
        );
    }

    #[test]
    fn string_pattern_conflict() {
        let result = merged(
            json!({ "type": "string", "pattern": "^a" }),
            json!({ "type": "string", "pattern": "^b" }),
        );
        assert!(matches!(result, Err(ComposeError::PatternConflict { .. })));
    }

    #[test]
    fn numeric_range_intersection() {
        let result = merged(
            json!({ "type": "number", "minimum": 0, "maximum": 100 }),
            json!({ "type": "number", "minimum": 10, "maximum": 50.5 }),
        )
        .unwrap();
        assert_eq!(result["minimum"], json!(10));
        assert_eq!(result["maximum"], json!(50.5));
    }

    #[test]
    fn numeric_range_disjoint_fails() {
        let result = merged(
            json!({ "type": "integer", "maximum": 5 }),
            json!({ "type": "integer", "minimum": 6 }),
        );
        assert!(matches!(result, Err(ComposeError::RangeConflict { .. })));
    }

    #[test]
    fn bound_from_untyped_side_is_range_checked() {
        let result = merged(
            json!({ "type": "integer", "maximum": 5 }),
            json!({ "minimum": 10 }),
        );
        assert!(matches!(result, Err(ComposeError::RangeConflict { .. })));

        let result = merged(json!({ "minimum": 10 }), json!({ "type": "number", "maximum": 5 }));
        assert!(matches!(result, Err(ComposeError::RangeConflict { .. })));

        let touching = merged(
            json!({ "type": "integer", "maximum": 5 }),
            json!({ "minimum": 5 }),
        )
        .unwrap();
        assert_eq!(touching["minimum"], json!(5));
        assert_eq!(touching["maximum"], json!(5));
    }

    #[test]
    fn exclusive_flag_from_either_side() {
        // The tighter minimum comes from the inclusive side; the flag is
        // still set because the other side was exclusive.
        let result = merged(
            json!({ "type": "integer", "minimum": 0, "exclusiveMinimum": true }),
            json!({ "type": "integer", "minimum": 5 }),
        )
        .unwrap();
        assert_eq!(result["minimum"], json!(5));
        assert_eq!(result["exclusiveMinimum"], json!(true));
    }

    #[test]
    fn multiple_of_is_product() {
        let result = merged(
            json!({ "type": "integer", "multipleOf": 4 }),
            json!({ "type": "integer", "multipleOf": 6 }),
        )
        .unwrap();
        assert_eq!(result["multipleOf"], json!(24));

        let single = merged(
            json!({ "type": "number" }),
            json!({ "type": "number", "multipleOf": 0.5 }),
        )
        .unwrap();
        assert_eq!(single["multipleOf"], json!(0.5));
    }

    #[test]
    fn multiple_of_overflow_is_invalid() {
        let result = merged(
            json!({ "type": "number", "multipleOf": 1e300 }),
            json!({ "type": "number", "multipleOf": 1e300 }),
        );
        assert!(matches!(result, Err(ComposeError::InvalidSchema { .. })));
    }

    #[test]
    fn boolean_enum() {
        let result = merged(
            json!({ "type": "boolean", "enum": [true, false] }),
            json!({ "enum": [true] }),
        )
        .unwrap();
        assert_eq!(result, json!({ "type": "boolean", "enum": [true] }));
    }

    #[test]
    fn enum_literal_must_match_type() {
        let result = merged(
            json!({ "type": "integer", "enum": [1, "two"] }),
            json!({ "enum": ["two"] }),
        );
        assert!(matches!(result, Err(ComposeError::EnumLiteralType { .. })));
    }

    #[test]
    fn untyped_structural_merge() {
        let result = merged(
            json!({ "properties": { "a": { "type": "string" } }, "required": ["a"] }),
            json!({ "properties": { "b": { "type": "string" } }, "required": ["b"], "x-tag": 1 }),
        )
        .unwrap();
        assert_eq!(
            result,
            json!({
                "properties": { "a": { "type": "string" }, "b": { "type": "string" } },
                "required": ["a", "b"],
                "x-tag": 1
            })
        );
    }

    #[test]
    fn rejects_not() {
        let result = merged(
            json!({ "type": "string" }),
            json!({ "type": "string", "not": { "enum": ["x"] } }),
        );
        assert!(matches!(
            result,
            Err(ComposeError::UnsupportedKeyword { keyword: "not" })
        ));
    }

    #[test]
    fn read_write_conflict_fails() {
        let result = merged(
            json!({ "type": "string", "readOnly": true }),
            json!({ "type": "string", "writeOnly": true }),
        );
        assert!(matches!(result, Err(ComposeError::ReadWriteConflict)));
    }
}
