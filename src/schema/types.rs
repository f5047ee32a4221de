//! Declarative field rules for [`ObjectSchema`](super::ObjectSchema)
//!
//! Supported kinds:
//! - string: UTF-8 string
//! - int: 64-bit integer
//! - bool: Boolean
//! - number: any JSON number
//! - object: nested object with its own rules
//! - array: homogeneous array with element kind
//! - any: any non-null value

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of value a field must hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Int,
    Bool,
    Number,
    /// Nested object validated against its own rules
    Object {
        fields: HashMap<String, FieldRule>,
        #[serde(default)]
        allow_extra: bool,
    },
    /// Homogeneous array
    Array {
        #[serde(rename = "element_type")]
        element_type: Box<FieldKind>,
    },
    Any,
}

impl FieldKind {
    /// Returns the kind name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Int => "int",
            FieldKind::Bool => "bool",
            FieldKind::Number => "number",
            FieldKind::Object { .. } => "object",
            FieldKind::Array { .. } => "array",
            FieldKind::Any => "any",
        }
    }
}

/// Rule for a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(flatten)]
    pub kind: FieldKind,

    /// Whether the field must be present
    #[serde(default)]
    pub required: bool,

    /// Inclusive lower bound for numbers, minimum length for strings and arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Inclusive upper bound for numbers, maximum length for strings and arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldRule {
    fn of(kind: FieldKind, required: bool) -> Self {
        Self {
            kind,
            required,
            min: None,
            max: None,
        }
    }

    pub fn required_string() -> Self {
        Self::of(FieldKind::String, true)
    }

    pub fn optional_string() -> Self {
        Self::of(FieldKind::String, false)
    }

    pub fn required_int() -> Self {
        Self::of(FieldKind::Int, true)
    }

    pub fn optional_int() -> Self {
        Self::of(FieldKind::Int, false)
    }

    pub fn required_bool() -> Self {
        Self::of(FieldKind::Bool, true)
    }

    pub fn required_number() -> Self {
        Self::of(FieldKind::Number, true)
    }

    pub fn required_object(fields: HashMap<String, FieldRule>) -> Self {
        Self::of(
            FieldKind::Object {
                fields,
                allow_extra: false,
            },
            true,
        )
    }

    pub fn required_array(element_type: FieldKind) -> Self {
        Self::of(
            FieldKind::Array {
                element_type: Box::new(element_type),
            },
            true,
        )
    }

    /// Constrain to an inclusive range
    pub fn between(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}
