//! Splitting composite nodes into fragments for the pairwise fold.
//!
//! Keywords declared before and after the composition array are kept as
//! their own fragments, in declaration order, so a trailing sibling such as
//! `nullable: true` is applied after the members rather than merged early.

use serde_json::{Map, Value};

use crate::error::ComposeError;
use crate::types::{json_type_name, Composition, UnionGroup, UNION_RETAINED_KEYS};

/// Result of splitting a union node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnionDecomposition {
    /// `[retained_before?, { <group>: members }, retained_after?]`.
    pub decomposed: Vec<Value>,
    /// Sibling keywords before the union array, reattached after the fold.
    pub before_excluded: Map<String, Value>,
    /// Sibling keywords after the union array, reattached after the fold.
    pub after_excluded: Map<String, Value>,
}

/// Split `node` around `allOf`.
///
/// Returns `[node]` if there is no `allOf`, otherwise
/// `[before?, ...members, after?]`.
pub fn decompose_intersection(node: &Value) -> Result<Vec<Value>, ComposeError> {
    decompose_group(node, Composition::AllOf)
}

/// Split `node` around one composition keyword, spreading its members.
pub fn decompose_group(
    node: &Value,
    composition: Composition,
) -> Result<Vec<Value>, ComposeError> {
    let keyword = composition.keyword();
    let Some(map) = node.as_object() else {
        return Ok(vec![node.clone()]);
    };
    let Some(members) = map.get(keyword) else {
        return Ok(vec![node.clone()]);
    };
    let members = member_array(keyword, members)?;

    let (before, after) = split_around(map, keyword);
    let mut fragments = Vec::with_capacity(members.len() + 2);
    if !before.is_empty() {
        fragments.push(Value::Object(before));
    }
    fragments.extend(members.iter().cloned());
    if !after.is_empty() {
        fragments.push(Value::Object(after));
    }
    Ok(fragments)
}

/// Split `node` around a union keyword.
///
/// Members are not spread: each is a whole alternative, so the member array
/// stays together as one `{ <group>: members }` fragment. Sibling
/// `discriminator` and `default` are retained as fragments next to it; every
/// other sibling is excluded from the fold and returned separately.
pub fn decompose_union(
    node: &Value,
    group: UnionGroup,
) -> Result<UnionDecomposition, ComposeError> {
    let keyword = group.keyword();
    let Some(map) = node.as_object() else {
        return Ok(UnionDecomposition {
            decomposed: vec![node.clone()],
            ..UnionDecomposition::default()
        });
    };
    let Some(members) = map.get(keyword) else {
        return Ok(UnionDecomposition {
            decomposed: vec![node.clone()],
            ..UnionDecomposition::default()
        });
    };
    let members = member_array(keyword, members)?;

    let (before, after) = split_around(map, keyword);
    let (before_retained, before_excluded) = partition_retained(before);
    let (after_retained, after_excluded) = partition_retained(after);

    let mut union_fragment = Map::new();
    union_fragment.insert(keyword.to_string(), Value::Array(members.to_vec()));

    let mut decomposed = Vec::with_capacity(3);
    if !before_retained.is_empty() {
        decomposed.push(Value::Object(before_retained));
    }
    decomposed.push(Value::Object(union_fragment));
    if !after_retained.is_empty() {
        decomposed.push(Value::Object(after_retained));
    }

    Ok(UnionDecomposition {
        decomposed,
        before_excluded,
        after_excluded,
    })
}

fn member_array<'a>(keyword: &str, members: &'a Value) -> Result<&'a [Value], ComposeError> {
    members
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ComposeError::InvalidSchema {
            message: format!("{} must be an array, got {}", keyword, json_type_name(members)),
        })
}

fn split_around(
    map: &Map<String, Value>,
    keyword: &str,
) -> (Map<String, Value>, Map<String, Value>) {
    let mut before = Map::new();
    let mut after = Map::new();
    let mut seen = false;
    for (key, value) in map {
        if key == keyword {
            seen = true;
        } else if seen {
            after.insert(key.clone(), value.clone());
        } else {
            before.insert(key.clone(), value.clone());
        }
    }
    (before, after)
}

fn partition_retained(map: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    map.into_iter()
        .partition(|(key, _)| UNION_RETAINED_KEYS.contains(&key.as_str()))
}
