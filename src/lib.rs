//! OpenAPI Schema Composition
//!
//! Resolves `allOf`, `oneOf` and `anyOf` in OpenAPI schemas into equivalent
//! schemas without composition keywords, failing precisely when two
//! constraints cannot both hold.
//!
//! # Example
//!
//! ```
//! use openapi_compose::{merge_intersection, ComposeError};
//! use serde_json::{json, Value};
//!
//! let resolver = |pointer: &str| -> Result<Value, ComposeError> {
//!     match pointer {
//!         "#/components/schemas/User" => Ok(json!({ "type": "string" })),
//!         _ => Err(ComposeError::UnresolvedReference { pointer: pointer.into() }),
//!     }
//! };
//!
//! let schema = json!({
//!     "allOf": [
//!         { "$ref": "#/components/schemas/User" },
//!         { "nullable": true }
//!     ]
//! });
//!
//! let composed = merge_intersection(&schema, &resolver).unwrap();
//! assert_eq!(composed, json!({ "type": "string", "nullable": true }));
//! ```
//!
//! # Merge Rules
//!
//! | Keyword | Combined as |
//! |---------|-------------|
//! | `type`, `format`, `pattern` | must agree (conflict otherwise) |
//! | `enum` | intersection, never empty |
//! | `properties` | deep union, shared names merged recursively |
//! | `required` | union |
//! | `minimum`, `minLength`, `minItems`, `minProperties` | max |
//! | `maximum`, `maxLength`, `maxItems`, `maxProperties` | min |
//! | `multipleOf` | product |
//! | `uniqueItems` | or |
//! | metadata (`title`, `description`, `default`, ...) | second wins |
//!
//! Unions are distributed: merging `oneOf: [A, B]` with `oneOf: [C, D]`
//! gives the alternatives among `A∩C, A∩D, B∩C, B∩D` that do not conflict.
//!
//! # Whole Documents
//!
//! [`compose_document`] walks every schema of a loaded OpenAPI document,
//! resolving references against the document itself through
//! [`DocumentResolver`].

mod conflicts;
mod decompose;
mod document;
mod equality;
mod error;
mod linter;
mod loader;
mod merge;
mod mergers;
mod types;
mod union;

pub use conflicts::{
    check_conflicts, check_enum_conflicts, check_format_conflicts, check_item_type_conflicts,
    check_range_conflicts, check_read_write_conflicts, check_type_conflicts, check_unsupported,
};
pub use decompose::{decompose_group, decompose_intersection, decompose_union, UnionDecomposition};
pub use document::{
    compose_document, compose_schema_at, ComposeDiagnostic, ComposeReport, DocumentResolver,
    Severity,
};
pub use equality::{deep_equal, merge_enum};
pub use error::{ComposeError, DocumentError, LoadError};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult};
pub use loader::{is_url, load_document, load_document_auto, load_document_str, navigate_fragment};
pub use merge::{merge_intersection, merge_schemas_or_refs, RefResolver};
pub use mergers::{
    merge_array_schemas, merge_boolean_schemas, merge_numeric_schemas, merge_object_schemas,
    merge_schemas, merge_string_schemas, merge_untyped_schemas,
};
pub use types::{
    json_type_name, AdditionalProperties, ComposeOptions, Composition, ErrorPolicy, Schema,
    SchemaKind, SchemaType, UnionGroup, UNION_RETAINED_KEYS,
};
pub use union::{merge_cross_product, merge_union};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
