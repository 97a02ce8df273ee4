//! Pairwise merging and the `allOf` orchestrator.

use serde_json::{Map, Value};
use tracing::trace;

use crate::decompose::decompose_intersection;
use crate::error::ComposeError;
use crate::mergers::merge_schemas;
use crate::types::{Schema, SchemaKind, UnionGroup};
use crate::union::merge_cross_product;

/// Looks up the schema a `$ref` pointer names.
///
/// Implementations close over one document. Errors pass through the merge
/// unchanged. Resolution is not cached here and cycles are not detected, so
/// an implementation should cap how many lookups it performs.
pub trait RefResolver {
    fn resolve_ref(&self, pointer: &str) -> Result<Value, ComposeError>;
}

impl<F> RefResolver for F
where
    F: Fn(&str) -> Result<Value, ComposeError>,
{
    fn resolve_ref(&self, pointer: &str) -> Result<Value, ComposeError> {
        self(pointer)
    }
}

/// Merge two schema-or-reference nodes into one.
///
/// 1. References are dereferenced, unless both sides point at the same
///    target, in which case their own fields are merged shallowly.
/// 2. `allOf` on either side is flattened first.
/// 3. A `oneOf` (then `anyOf`) on either side is distributed over the other.
/// 4. Otherwise the type-specific mergers apply.
///
/// # Errors
///
/// Any conflict or unsupported construct, or an error from `resolver`.
pub fn merge_schemas_or_refs<R>(
    first: &Value,
    second: &Value,
    resolver: &R,
) -> Result<Value, ComposeError>
where
    R: RefResolver + ?Sized,
{
    let a = Schema::from_value(first)?;
    let b = Schema::from_value(second)?;

    match (a.kind(), b.kind()) {
        (SchemaKind::Reference(p), SchemaKind::Reference(q)) if p == q => {
            Ok(shallow_merge(first, second))
        }
        (SchemaKind::Reference(_), _) | (_, SchemaKind::Reference(_)) => {
            if is_empty(first) {
                return Ok(second.clone());
            }
            if is_empty(second) {
                return Ok(first.clone());
            }
            let first = dereference(first, &a, resolver)?;
            let second = dereference(second, &b, resolver)?;
            merge_schemas_or_refs(&first, &second, resolver)
        }
        (SchemaKind::Intersection(_), _) | (_, SchemaKind::Intersection(_)) => {
            let first = flatten(first, &a, resolver)?;
            let second = flatten(second, &b, resolver)?;
            merge_schemas_or_refs(&first, &second, resolver)
        }
        (SchemaKind::Union(..), _) | (_, SchemaKind::Union(..)) => {
            let group = if a.one_of.is_some() || b.one_of.is_some() {
                UnionGroup::OneOf
            } else {
                UnionGroup::AnyOf
            };
            merge_cross_product(first, second, group, resolver)
        }
        (
            SchemaKind::Typed(_) | SchemaKind::Untyped,
            SchemaKind::Typed(_) | SchemaKind::Untyped,
        ) => merge_schemas(&a, &b, resolver)?.into_value(),
    }
}

/// Resolve the `allOf` of a node into a single schema.
///
/// The node is split into fragments (see
/// [`decompose_intersection`](crate::decompose_intersection)) and folded
/// left to right through [`merge_schemas_or_refs`], starting from an empty
/// schema. A node that yields a single fragment is returned unchanged.
pub fn merge_intersection<R>(schema: &Value, resolver: &R) -> Result<Value, ComposeError>
where
    R: RefResolver + ?Sized,
{
    let fragments = decompose_intersection(schema)?;
    if let [only] = fragments.as_slice() {
        return Ok(only.clone());
    }

    fragments
        .iter()
        .try_fold(Value::Object(Map::new()), |merged, fragment| {
            merge_schemas_or_refs(&merged, fragment, resolver)
        })
}

/// Overlay `second`'s keys onto `first`'s.
pub(crate) fn shallow_merge(first: &Value, second: &Value) -> Value {
    let mut merged = first.as_object().cloned().unwrap_or_default();
    if let Some(map) = second.as_object() {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

fn is_empty(value: &Value) -> bool {
    value.as_object().is_some_and(Map::is_empty)
}

fn dereference<R>(raw: &Value, schema: &Schema, resolver: &R) -> Result<Value, ComposeError>
where
    R: RefResolver + ?Sized,
{
    let Some(pointer) = &schema.reference else {
        return Ok(raw.clone());
    };
    trace!(pointer = %pointer, "dereferencing");
    let target = resolver.resolve_ref(pointer)?;

    let siblings: Map<String, Value> = raw
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| key.as_str() != "$ref")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    if siblings.is_empty() {
        Ok(target)
    } else {
        merge_schemas_or_refs(&target, &Value::Object(siblings), resolver)
    }
}

fn flatten<R>(raw: &Value, schema: &Schema, resolver: &R) -> Result<Value, ComposeError>
where
    R: RefResolver + ?Sized,
{
    match schema.kind() {
        SchemaKind::Intersection(_) => merge_intersection(raw, resolver),
        _ => Ok(raw.clone()),
    }
}
