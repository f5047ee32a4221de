//! Declarative object validation
//!
//! Validation semantics:
//! - The root value must be an object
//! - All required fields are present
//! - No undeclared fields exist unless `allow_extra` is set
//! - Field kinds match exactly, without coercion
//! - Numeric bounds and length bounds are inclusive
//! - Null field values are rejected
//!
//! Validation is deterministic and never mutates the value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::types::{FieldKind, FieldRule};
use super::Schema;

/// Field-rule schema for object payloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    /// Declared fields
    pub fields: HashMap<String, FieldRule>,

    /// Accept fields that are not declared
    #[serde(default)]
    pub allow_extra: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    /// Accept undeclared fields
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    /// Checks a value and explains the first violation.
    pub fn check(&self, value: &Value) -> SchemaResult<()> {
        let obj = value.as_object().ok_or_else(|| {
            SchemaError::validation_failed(ValidationDetails::new(
                "$root",
                "object",
                json_type_name(value),
            ))
        })?;
        check_object(obj, &self.fields, self.allow_extra, "")
    }
}

impl Schema for ObjectSchema {
    fn validate(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }
}

fn check_object(
    obj: &Map<String, Value>,
    fields: &HashMap<String, FieldRule>,
    allow_extra: bool,
    path_prefix: &str,
) -> SchemaResult<()> {
    if !allow_extra {
        if let Some(key) = obj.keys().find(|k| !fields.contains_key(*k)) {
            return Err(SchemaError::validation_failed(ValidationDetails::extra_field(
                make_path(path_prefix, key),
            )));
        }
    }

    for (name, rule) in fields {
        let field_path = make_path(path_prefix, name);

        match obj.get(name) {
            Some(Value::Null) => {
                return Err(SchemaError::validation_failed(ValidationDetails::null_value(
                    field_path,
                )));
            }
            Some(value) => check_value(value, &rule.kind, rule, &field_path)?,
            None if rule.required => {
                return Err(SchemaError::validation_failed(
                    ValidationDetails::missing_field(field_path),
                ));
            }
            None => {}
        }
    }

    Ok(())
}

fn check_value(value: &Value, kind: &FieldKind, rule: &FieldRule, path: &str) -> SchemaResult<()> {
    match kind {
        FieldKind::String => {
            let s = value.as_str().ok_or_else(|| type_error(path, "string", value))?;
            check_bounds(s.chars().count() as f64, rule, path)?;
        }
        FieldKind::Int => {
            if !value.is_i64() && !value.is_u64() {
                return Err(type_error(path, "int", value));
            }
            check_bounds(value.as_f64().unwrap_or_default(), rule, path)?;
        }
        FieldKind::Number => {
            let n = value.as_f64().ok_or_else(|| type_error(path, "number", value))?;
            check_bounds(n, rule, path)?;
        }
        FieldKind::Bool => {
            if !value.is_boolean() {
                return Err(type_error(path, "bool", value));
            }
        }
        FieldKind::Object {
            fields,
            allow_extra,
        } => {
            let obj = value.as_object().ok_or_else(|| type_error(path, "object", value))?;
            check_object(obj, fields, *allow_extra, path)?;
        }
        FieldKind::Array { element_type } => {
            let arr = value.as_array().ok_or_else(|| type_error(path, "array", value))?;
            check_bounds(arr.len() as f64, rule, path)?;

            for (i, elem) in arr.iter().enumerate() {
                let elem_path = format!("{}[{}]", path, i);
                if elem.is_null() {
                    return Err(SchemaError::validation_failed(
                        ValidationDetails::null_value(elem_path),
                    ));
                }
                // Element rules carry no bounds of their own.
                let elem_rule = FieldRule {
                    kind: (**element_type).clone(),
                    required: true,
                    min: None,
                    max: None,
                };
                check_value(elem, element_type, &elem_rule, &elem_path)?;
            }
        }
        FieldKind::Any => {}
    }

    Ok(())
}

fn check_bounds(actual: f64, rule: &FieldRule, path: &str) -> SchemaResult<()> {
    let below = rule.min.is_some_and(|min| actual < min);
    let above = rule.max.is_some_and(|max| actual > max);
    if below || above {
        return Err(SchemaError::validation_failed(
            ValidationDetails::out_of_range(path, rule.min, rule.max, actual),
        ));
    }
    Ok(())
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn type_error(path: &str, expected: &str, actual: &Value) -> SchemaError {
    SchemaError::validation_failed(ValidationDetails::new(
        path,
        expected,
        json_type_name(actual),
    ))
}
