//! Schema derived from a Rust type

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::Schema;

type Check<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Accepts values that deserialize into `T` and pass an optional predicate.
pub struct TypedSchema<T> {
    check: Option<Check<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> TypedSchema<T> {
    pub fn new() -> Self {
        Self {
            check: None,
            _marker: PhantomData,
        }
    }

    /// Add a predicate on the decoded value
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.check = Some(Arc::new(check));
        self
    }

    /// Decode a value this schema accepts
    pub fn decode(&self, value: &Value) -> Option<T> {
        let decoded = T::deserialize(value).ok()?;
        match &self.check {
            Some(check) if !check(&decoded) => None,
            _ => Some(decoded),
        }
    }
}

impl<T: DeserializeOwned> Default for TypedSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TypedSchema<T> {
    fn clone(&self) -> Self {
        Self {
            check: self.check.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSchema")
            .field("type", &std::any::type_name::<T>())
            .field("has_check", &self.check.is_some())
            .finish()
    }
}

impl<T: DeserializeOwned> Schema for TypedSchema<T> {
    fn validate(&self, value: &Value) -> bool {
        self.decode(value).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Settings {
        #[serde(rename = "fontSize")]
        font_size: u32,
    }

    #[test]
    fn test_shape_and_predicate() {
        let schema = TypedSchema::<Settings>::new().with_check(|s| (10..=32).contains(&s.font_size));

        assert!(schema.validate(&json!({"fontSize": 16})));
        assert!(!schema.validate(&json!({"fontSize": 999})));
        assert!(!schema.validate(&json!({"fontSize": "16"})));
        assert_eq!(
            schema.decode(&json!({"fontSize": 20})),
            Some(Settings { font_size: 20 })
        );
    }

    #[test]
    fn test_without_predicate_only_shape_matters() {
        let schema = TypedSchema::<Vec<String>>::new();
        assert!(schema.validate(&json!(["a", "b"])));
        assert!(!schema.validate(&json!([1])));
    }
}
