//! Error types for schema composition and document loading.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::types::{SchemaType, UnionGroup};

/// Errors raised while composing schemas.
///
/// Every variant is fatal to the merge call that raised it. The caller
/// decides whether that aborts a document or skips one schema.
#[derive(Debug, Error)]
pub enum ComposeError {
    // Conflicts
    #[error("type conflict: cannot merge type \"{first}\" with type \"{second}\"")]
    TypeConflict { first: SchemaType, second: SchemaType },

    #[error("format conflict: cannot merge format \"{first}\" with format \"{second}\"")]
    FormatConflict { first: String, second: String },

    #[error(
        "enum conflict: no common values between {} and {}",
        render_values(first),
        render_values(second)
    )]
    EmptyEnumIntersection { first: Vec<Value>, second: Vec<Value> },

    #[error("enum value {value} is not a valid {expected}")]
    EnumLiteralType { value: Value, expected: SchemaType },

    #[error("readOnly/writeOnly conflict: cannot merge a readOnly schema with a writeOnly schema")]
    ReadWriteConflict,

    #[error("numeric range conflict: {first} does not overlap {second}")]
    RangeConflict { first: String, second: String },

    #[error("array item type conflict: cannot merge items of type \"{first}\" with items of type \"{second}\"")]
    ItemTypeConflict { first: String, second: String },

    #[error("pattern conflict: cannot merge pattern \"{first}\" with pattern \"{second}\"")]
    PatternConflict { first: String, second: String },

    // Unsupported constructs
    #[error("unsupported keyword \"{keyword}\"")]
    UnsupportedKeyword { keyword: &'static str },

    #[error("empty {group} array")]
    EmptyUnion { group: UnionGroup },

    #[error("cannot merge array schemas: neither side declares items")]
    MissingItems,

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    // Reference resolution
    #[error("unresolved reference: {pointer}")]
    UnresolvedReference { pointer: String },

    #[error("unsupported reference \"{pointer}\": only local '#/...' pointers can be resolved")]
    UnsupportedReference { pointer: String },

    #[error("exceeded {limit} reference lookups while resolving {pointer}")]
    ReferenceBudgetExceeded { pointer: String, limit: usize },
}

impl ComposeError {
    /// Whether this error is a provable incompatibility between two
    /// constraints, as opposed to an unsupported or unresolvable input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::TypeConflict { .. }
                | Self::FormatConflict { .. }
                | Self::EmptyEnumIntersection { .. }
                | Self::EnumLiteralType { .. }
                | Self::ReadWriteConflict
                | Self::RangeConflict { .. }
                | Self::ItemTypeConflict { .. }
                | Self::PatternConflict { .. }
        )
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// A composition failure at a location in a document.
#[derive(Debug, Error)]
#[error("{path}: {source}")]
pub struct DocumentError {
    /// JSON pointer of the schema that failed to compose.
    pub path: String,
    #[source]
    pub source: ComposeError,
}

impl DocumentError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}

fn render_values(values: &[Value]) -> String {
    Value::Array(values.to_vec()).to_string()
}

/// Errors while loading a document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("fragment not found: {fragment}")]
    FragmentNotFound { fragment: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
