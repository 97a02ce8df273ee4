//! Core types for schema composition.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::ComposeError;

/// Sibling keywords that stay on a union node next to its member array.
pub const UNION_RETAINED_KEYS: &[&str] = &["discriminator", "default"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declared `type` of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

impl SchemaType {
    /// Returns the keyword value as written in a document.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SchemaType::Number | SchemaType::Integer)
    }

    /// Whether a literal (e.g. an enum member) is an instance of this type.
    pub fn accepts_literal(&self, value: &Value) -> bool {
        match self {
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
            SchemaType::String => value.is_string(),
            SchemaType::Number => value.is_number(),
            SchemaType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            SchemaType::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A composition keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    AllOf,
    OneOf,
    AnyOf,
}

impl Composition {
    pub fn keyword(&self) -> &'static str {
        match self {
            Composition::AllOf => "allOf",
            Composition::OneOf => "oneOf",
            Composition::AnyOf => "anyOf",
        }
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The union keywords. Each member of a union is a whole alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnionGroup {
    OneOf,
    AnyOf,
}

impl UnionGroup {
    pub fn keyword(&self) -> &'static str {
        self.composition().keyword()
    }

    pub fn composition(&self) -> Composition {
        match self {
            UnionGroup::OneOf => Composition::OneOf,
            UnionGroup::AnyOf => Composition::AnyOf,
        }
    }
}

impl fmt::Display for UnionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// `additionalProperties` is either a flag or a nested schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Value),
}

/// A single schema node.
///
/// The node's own keywords are typed. Nested schema positions (`properties`
/// values, `items`, composition members) stay raw: they are composed later,
/// one level at a time, and decomposition depends on their key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    // object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,

    // array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    // string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // number / integer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,

    // composition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<Value>,

    /// Vendor extensions (`x-*`) and any keyword not modelled above.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

/// What a schema node is, for dispatch.
///
/// Precedence follows the merge pipeline: a `$ref` is dereferenced first,
/// then `allOf` is flattened, then unions are distributed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaKind<'a> {
    Reference(&'a str),
    Intersection(&'a [Value]),
    Union(UnionGroup, &'a [Value]),
    Typed(SchemaType),
    Untyped,
}

impl Schema {
    /// Parse a raw node.
    ///
    /// # Errors
    ///
    /// Returns `ComposeError::InvalidSchema` if the value is not an object or
    /// a keyword has the wrong shape (e.g. an unknown `type`).
    pub fn from_value(value: &Value) -> Result<Self, ComposeError> {
        if !value.is_object() {
            return Err(ComposeError::InvalidSchema {
                message: format!("expected schema object, got {}", json_type_name(value)),
            });
        }
        serde_json::from_value(value.clone()).map_err(|e| ComposeError::InvalidSchema {
            message: e.to_string(),
        })
    }

    /// Serialize back into a raw node.
    pub fn into_value(self) -> Result<Value, ComposeError> {
        serde_json::to_value(self).map_err(|e| ComposeError::InvalidSchema {
            message: e.to_string(),
        })
    }

    pub fn kind(&self) -> SchemaKind<'_> {
        if let Some(pointer) = &self.reference {
            return SchemaKind::Reference(pointer);
        }
        if let Some(members) = &self.all_of {
            return SchemaKind::Intersection(members);
        }
        if let Some(members) = &self.one_of {
            return SchemaKind::Union(UnionGroup::OneOf, members);
        }
        if let Some(members) = &self.any_of {
            return SchemaKind::Union(UnionGroup::AnyOf, members);
        }
        match self.schema_type {
            Some(ty) => SchemaKind::Typed(ty),
            None => SchemaKind::Untyped,
        }
    }

    /// Member list of the given composition keyword, if declared.
    pub fn members(&self, composition: Composition) -> Option<&[Value]> {
        match composition {
            Composition::AllOf => self.all_of.as_deref(),
            Composition::OneOf => self.one_of.as_deref(),
            Composition::AnyOf => self.any_of.as_deref(),
        }
    }
}

/// What to do when composing one schema of a document fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Leave the failing schema as declared, record a diagnostic, continue.
    Skip,
}

/// Options for composing a document.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub policy: ErrorPolicy,
    /// Total dereferences allowed while composing one schema node.
    pub max_ref_lookups: usize,
    /// Longest `$ref` to `$ref` chain followed for a single pointer.
    pub max_ref_chain: usize,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            policy: ErrorPolicy::Abort,
            max_ref_lookups: 256,
            max_ref_chain: 32,
        }
    }
}

impl ComposeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_ref_lookups(mut self, limit: usize) -> Self {
        self.max_ref_lookups = limit;
        self
    }

    pub fn max_ref_chain(mut self, limit: usize) -> Self {
        self.max_ref_chain = limit;
        self
    }
}
