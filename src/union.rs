//! Union distribution over `oneOf` / `anyOf`.

use serde_json::{Map, Value};
use tracing::debug;

use crate::decompose::decompose_union;
use crate::error::ComposeError;
use crate::merge::{merge_schemas_or_refs, shallow_merge, RefResolver};
use crate::types::{json_type_name, UnionGroup, UNION_RETAINED_KEYS};

/// Resolve the `group` union of a node.
///
/// The node is split (see [`decompose_union`](crate::decompose_union)) and
/// its fragments folded left to right with [`merge_cross_product`]. Sibling
/// keywords excluded by the split are reattached around the result. A node
/// without the `group` keyword is returned unchanged.
///
/// # Errors
///
/// `EmptyUnion` for a declared but empty member array; any non-conflict
/// error from merging a pair of alternatives.
pub fn merge_union<R>(
    schema: &Value,
    resolver: &R,
    group: UnionGroup,
) -> Result<Value, ComposeError>
where
    R: RefResolver + ?Sized,
{
    if union_members(schema, group)?.is_none() {
        return Ok(schema.clone());
    }

    let parts = decompose_union(schema, group)?;
    let mut fragments = parts.decomposed.iter();
    let Some(head) = fragments.next() else {
        return Ok(schema.clone());
    };
    let folded = fragments.try_fold(head.clone(), |merged, fragment| {
        merge_cross_product(&merged, fragment, group, resolver)
    })?;

    let mut result = parts.before_excluded;
    if let Value::Object(map) = folded {
        result.extend(map);
    }
    result.extend(parts.after_excluded);
    Ok(Value::Object(result))
}

/// Distribute a merge over the alternatives of a union.
///
/// A side without the `group` keyword counts as a single alternative. Each
/// pair in `first × second` is merged with [`merge_schemas_or_refs`], in
/// row-major order; pairs that conflict are dropped. The result is
/// `{ <group>: survivors }` alongside the union sides' other keywords, and
/// may hold no alternatives at all.
///
/// Keywords next to a member array constrain every alternative, so they are
/// merged with the other operand (or with the other side's keywords when
/// both sides are unions) before distributing.
///
/// A side carrying only `discriminator` / `default` annotates the union
/// instead of being distributed into it.
///
/// # Errors
///
/// `EmptyUnion` if a side declares an empty member array; any error from
/// merging the keywords next to a member array; any error from a pair that
/// is not a conflict.
pub fn merge_cross_product<R>(
    first: &Value,
    second: &Value,
    group: UnionGroup,
    resolver: &R,
) -> Result<Value, ComposeError>
where
    R: RefResolver + ?Sized,
{
    let left = union_members(first, group)?;
    let right = union_members(second, group)?;

    match (&left, &right) {
        (None, None) => return merge_schemas_or_refs(first, second, resolver),
        (Some(_), None) if annotation_only(second) => return Ok(shallow_merge(first, second)),
        (None, Some(_)) if annotation_only(first) => return Ok(shallow_merge(first, second)),
        _ => {}
    }

    let sides = (left.is_some(), right.is_some());
    let mut wrapper = union_siblings(first, second, sides, group, resolver)?;

    let left = left.unwrap_or_else(|| vec![first.clone()]);
    let right = right.unwrap_or_else(|| vec![second.clone()]);

    let mut survivors = Vec::with_capacity(left.len() * right.len());
    for (i, a) in left.iter().enumerate() {
        for (j, b) in right.iter().enumerate() {
            match merge_schemas_or_refs(a, b, resolver) {
                Ok(merged) => survivors.push(merged),
                Err(err) if err.is_conflict() => {
                    debug!(
                        group = %group,
                        left = i,
                        right = j,
                        error = %err,
                        "pruned union alternative"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    wrapper.insert(group.keyword().to_string(), Value::Array(survivors));
    Ok(Value::Object(wrapper))
}

/// Keywords of the union sides other than the member array, merged with
/// the opposite operand so a conflict surfaces instead of being copied.
fn union_siblings<R>(
    first: &Value,
    second: &Value,
    sides: (bool, bool),
    group: UnionGroup,
    resolver: &R,
) -> Result<Map<String, Value>, ComposeError>
where
    R: RefResolver + ?Sized,
{
    let a = without_members(first, group);
    let b = without_members(second, group);

    match sides {
        (true, true) if a.is_empty() => Ok(b),
        (true, true) if b.is_empty() => Ok(a),
        (true, true) => {
            let (a, b) = (Value::Object(a), Value::Object(b));
            let merged = sibling_merge(&a, &b, resolver)?.unwrap_or_else(|| shallow_merge(&a, &b));
            Ok(merged.as_object().cloned().unwrap_or_default())
        }
        (true, false) => {
            if !a.is_empty() {
                sibling_merge(&Value::Object(a.clone()), second, resolver)?;
            }
            Ok(a)
        }
        (false, true) => {
            if !b.is_empty() {
                sibling_merge(first, &Value::Object(b.clone()), resolver)?;
            }
            Ok(b)
        }
        (false, false) => Ok(Map::new()),
    }
}

fn sibling_merge<R>(
    first: &Value,
    second: &Value,
    resolver: &R,
) -> Result<Option<Value>, ComposeError>
where
    R: RefResolver + ?Sized,
{
    match merge_schemas_or_refs(first, second, resolver) {
        Ok(merged) => Ok(Some(merged)),
        // `items` may be declared by the alternatives alone.
        Err(ComposeError::MissingItems) => Ok(None),
        Err(err) => Err(err),
    }
}

fn without_members(node: &Value, group: UnionGroup) -> Map<String, Value> {
    let keyword = group.keyword();
    node.as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| key.as_str() != keyword)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn union_members(node: &Value, group: UnionGroup) -> Result<Option<Vec<Value>>, ComposeError> {
    let Some(members) = node.get(group.keyword()) else {
        return Ok(None);
    };
    let Some(members) = members.as_array() else {
        return Err(ComposeError::InvalidSchema {
            message: format!("{} must be an array, got {}", group, json_type_name(members)),
        });
    };
    if members.is_empty() {
        return Err(ComposeError::EmptyUnion { group });
    }
    Ok(Some(members.clone()))
}

fn annotation_only(node: &Value) -> bool {
    node.as_object().is_some_and(|map| {
        map.keys()
            .all(|key| UNION_RETAINED_KEYS.contains(&key.as_str()))
    })
}
