//! Composing every schema of an OpenAPI document.
//!
//! The walker visits each schema position in the document, resolves its
//! composition keywords one level at a time, and then descends into the
//! composed node's children. `$ref` nodes are left in place.

use std::cell::Cell;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ComposeError, DocumentError};
use crate::merge::{merge_intersection, RefResolver};
use crate::types::{ComposeOptions, ErrorPolicy, UnionGroup};
use crate::union::merge_union;

/// Sections under `components` whose entries may carry a `schema`.
const SCHEMA_CARRIERS: &[&str] = &["parameters", "requestBodies", "responses", "headers"];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A problem found while composing a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeDiagnostic {
    pub severity: Severity,
    pub code: String,
    /// JSON pointer of the schema (e.g. "#/components/schemas/Pet")
    pub path: String,
    pub message: String,
}

/// Result of composing a document or subtree.
#[derive(Debug, Clone)]
pub struct ComposeReport {
    pub document: Value,
    /// Number of schema nodes whose composition keywords were resolved.
    pub composed: usize,
    pub diagnostics: Vec<ComposeDiagnostic>,
}

impl ComposeReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

/// Resolves local `#/...` pointers against one document.
///
/// Every lookup counts against a budget, so a self-referencing composition
/// fails with `ReferenceBudgetExceeded` rather than recursing forever.
#[derive(Debug)]
pub struct DocumentResolver<'a> {
    document: &'a Value,
    max_lookups: usize,
    max_chain: usize,
    lookups: Cell<usize>,
}

impl<'a> DocumentResolver<'a> {
    pub fn new(document: &'a Value, options: &ComposeOptions) -> Self {
        Self {
            document,
            max_lookups: options.max_ref_lookups,
            max_chain: options.max_ref_chain,
            lookups: Cell::new(0),
        }
    }

    /// Lookups performed since creation or the last [`reset`](Self::reset).
    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    pub fn reset(&self) {
        self.lookups.set(0);
    }

    fn lookup(&self, pointer: &str) -> Result<&'a Value, ComposeError> {
        let Some(path) = pointer.strip_prefix('#') else {
            return Err(ComposeError::UnsupportedReference {
                pointer: pointer.to_string(),
            });
        };
        self.document
            .pointer(path)
            .ok_or_else(|| ComposeError::UnresolvedReference {
                pointer: pointer.to_string(),
            })
    }
}

impl RefResolver for DocumentResolver<'_> {
    /// Follows `$ref`-only targets until a schema with content is reached.
    fn resolve_ref(&self, pointer: &str) -> Result<Value, ComposeError> {
        let mut current = pointer;
        for _ in 0..=self.max_chain {
            let used = self.lookups.get() + 1;
            if used > self.max_lookups {
                return Err(ComposeError::ReferenceBudgetExceeded {
                    pointer: pointer.to_string(),
                    limit: self.max_lookups,
                });
            }
            self.lookups.set(used);

            let target = self.lookup(current)?;
            match ref_only(target) {
                Some(next) => current = next,
                None => return Ok(target.clone()),
            }
        }
        Err(ComposeError::ReferenceBudgetExceeded {
            pointer: pointer.to_string(),
            limit: self.max_chain,
        })
    }
}

/// Compose every schema in an OpenAPI document.
///
/// Visits `components.schemas`, and every `schema` under `paths` and the
/// `components` sections that carry one.
///
/// # Errors
///
/// With [`ErrorPolicy::Abort`], the first schema that fails to compose.
/// With [`ErrorPolicy::Skip`] failures are recorded in the report instead.
pub fn compose_document(
    document: &Value,
    options: &ComposeOptions,
) -> Result<ComposeReport, DocumentError> {
    let resolver = DocumentResolver::new(document, options);
    let mut walker = Walker::new(&resolver, options.policy);
    let mut output = document.clone();

    if let Some(schemas) = output
        .pointer_mut("/components/schemas")
        .and_then(Value::as_object_mut)
    {
        for (name, schema) in schemas.iter_mut() {
            let path = format!("#/components/schemas/{}", escape(name));
            walker.compose(schema, &path)?;
        }
    }

    if let Some(paths) = output.get_mut("paths") {
        walker.find_schemas(paths, "#/paths")?;
    }
    for section in SCHEMA_CARRIERS {
        if let Some(value) = output
            .get_mut("components")
            .and_then(|components| components.get_mut(*section))
        {
            walker.find_schemas(value, &format!("#/components/{}", section))?;
        }
    }

    Ok(walker.finish(output))
}

/// Compose the schema at `pointer` and everything below it.
///
/// `$ref`s inside the subtree resolve against the whole document.
///
/// # Errors
///
/// `UnresolvedReference` if `pointer` does not exist, plus anything
/// [`compose_document`] can return.
pub fn compose_schema_at(
    document: &Value,
    pointer: &str,
    options: &ComposeOptions,
) -> Result<ComposeReport, DocumentError> {
    let path = if pointer.starts_with('#') {
        pointer.to_string()
    } else {
        format!("#{}", pointer)
    };
    let resolver = DocumentResolver::new(document, options);
    let mut schema = resolver.lookup(&path).cloned().map_err(|source| DocumentError {
        path: path.clone(),
        source,
    })?;

    let mut walker = Walker::new(&resolver, options.policy);
    walker.compose(&mut schema, &path)?;
    Ok(walker.finish(schema))
}

struct Walker<'r, 'a> {
    resolver: &'r DocumentResolver<'a>,
    policy: ErrorPolicy,
    composed: usize,
    diagnostics: Vec<ComposeDiagnostic>,
}

impl<'r, 'a> Walker<'r, 'a> {
    fn new(resolver: &'r DocumentResolver<'a>, policy: ErrorPolicy) -> Self {
        Self {
            resolver,
            policy,
            composed: 0,
            diagnostics: Vec::new(),
        }
    }

    fn finish(self, document: Value) -> ComposeReport {
        ComposeReport {
            document,
            composed: self.composed,
            diagnostics: self.diagnostics,
        }
    }

    /// Search a non-schema subtree for `schema` keys.
    fn find_schemas(&mut self, value: &mut Value, path: &str) -> Result<(), DocumentError> {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    let child_path = format!("{}/{}", path, escape(key));
                    match key.as_str() {
                        "schema" => self.compose(child, &child_path)?,
                        "example" | "examples" => {}
                        _ => self.find_schemas(child, &child_path)?,
                    }
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    self.find_schemas(item, &format!("{}/{}", path, i))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolve one schema node, then its children.
    fn compose(&mut self, node: &mut Value, path: &str) -> Result<(), DocumentError> {
        if !node.is_object() || node.get("$ref").is_some() {
            return Ok(());
        }

        self.resolver.reset();
        let result = if node.get("allOf").is_some() {
            Some(merge_intersection(node, self.resolver))
        } else if node.get("oneOf").is_some() {
            Some(merge_union(node, self.resolver, UnionGroup::OneOf))
        } else if node.get("anyOf").is_some() {
            Some(merge_union(node, self.resolver, UnionGroup::AnyOf))
        } else {
            None
        };

        match result {
            Some(Ok(composed)) => {
                debug!(path, lookups = self.resolver.lookups(), "composed schema");
                *node = composed;
                self.composed += 1;
            }
            Some(Err(source)) => match self.policy {
                ErrorPolicy::Abort => {
                    return Err(DocumentError {
                        path: path.to_string(),
                        source,
                    })
                }
                ErrorPolicy::Skip => {
                    debug!(path, error = %source, "skipped schema");
                    self.diagnostics.push(ComposeDiagnostic {
                        severity: Severity::Error,
                        code: "E010".to_string(),
                        path: path.to_string(),
                        message: source.to_string(),
                    });
                }
            },
            None => {}
        }

        for group in [UnionGroup::OneOf, UnionGroup::AnyOf] {
            if node
                .get(group.keyword())
                .and_then(Value::as_array)
                .is_some_and(Vec::is_empty)
            {
                self.diagnostics.push(ComposeDiagnostic {
                    severity: Severity::Warning,
                    code: "W001".to_string(),
                    path: path.to_string(),
                    message: format!("{} has no compatible alternatives", group),
                });
            }
        }

        self.compose_children(node, path)
    }

    fn compose_children(&mut self, node: &mut Value, path: &str) -> Result<(), DocumentError> {
        let Some(map) = node.as_object_mut() else {
            return Ok(());
        };

        if let Some(properties) = map.get_mut("properties").and_then(Value::as_object_mut) {
            for (name, schema) in properties.iter_mut() {
                self.compose(schema, &format!("{}/properties/{}", path, escape(name)))?;
            }
        }
        for key in ["items", "additionalProperties"] {
            if let Some(schema) = map.get_mut(key) {
                self.compose(schema, &format!("{}/{}", path, key))?;
            }
        }
        for key in ["allOf", "oneOf", "anyOf"] {
            if let Some(members) = map.get_mut(key).and_then(Value::as_array_mut) {
                for (i, member) in members.iter_mut().enumerate() {
                    self.compose(member, &format!("{}/{}/{}", path, key, i))?;
                }
            }
        }
        Ok(())
    }
}

fn ref_only(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("$ref").and_then(Value::as_str)
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
