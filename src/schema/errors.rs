//! Schema error types
//!
//! Validation failures never reach store consumers; records repair instead.
//! These errors surface only where a schema is loaded or explicitly checked.

use std::fmt;

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Where and why a value failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationDetails {
    /// Field path (e.g., "theme.colors[2]"), `$root` for the value itself
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }

    pub fn out_of_range(field: impl Into<String>, min: Option<f64>, max: Option<f64>, actual: f64) -> Self {
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_else(|| "..".into());
        Self::new(
            field,
            format!("value in [{}, {}]", bound(min), bound(max)),
            actual.to_string(),
        )
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Schema errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Value does not satisfy the schema
    #[error("Schema validation failed: {0}")]
    ValidationFailed(ValidationDetails),

    /// Schema definition could not be read or parsed
    #[error("Malformed schema at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl SchemaError {
    pub fn validation_failed(details: ValidationDetails) -> Self {
        SchemaError::ValidationFailed(details)
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Validation details, if this is a validation failure
    pub fn details(&self) -> Option<&ValidationDetails> {
        match self {
            SchemaError::ValidationFailed(details) => Some(details),
            SchemaError::Malformed { .. } => None,
        }
    }
}
