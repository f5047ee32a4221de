//! Validation collaborators
//!
//! A [`Schema`] is an opaque predicate over JSON payloads. Records call it on
//! every value entering memory and substitute their repair target when it
//! fails. Absent values never reach the predicate.
//!
//! # Implementations
//!
//! - Closures `Fn(&Value) -> bool`
//! - [`TypedSchema`]: the value must decode into a Rust type
//! - [`ObjectSchema`]: declarative field rules, loadable from JSON
//! - [`AcceptAll`]

mod errors;
mod loader;
mod typed;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult, ValidationDetails};
pub use loader::{load_schema_file, parse_schema};
pub use typed::TypedSchema;
pub use types::{FieldKind, FieldRule};
pub use validator::ObjectSchema;

use serde_json::Value;

/// Pure validation predicate
pub trait Schema: Send + Sync {
    /// Whether `value` is acceptable. Must not have side effects.
    fn validate(&self, value: &Value) -> bool;
}

impl<F> Schema for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn validate(&self, value: &Value) -> bool {
        self(value)
    }
}

/// Accepts every value
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Schema for AcceptAll {
    fn validate(&self, _value: &Value) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_schema() {
        let schema = |v: &Value| v.is_string();
        assert!(schema.validate(&json!("x")));
        assert!(!schema.validate(&json!(1)));
        assert!(AcceptAll.validate(&json!(null)));
    }
}
