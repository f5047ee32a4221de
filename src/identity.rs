//! # Store Identity
//!
//! Composite identity of a persisted value: `(db_name, store_name, key)`.
//!
//! The `(db_name, store_name)` pair is the [`Namespace`]. It scopes both the
//! durable partition and the broadcast channel, so two records synchronize
//! if and only if all three components match.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default database and store name
pub const DEFAULT_NAMESPACE_PART: &str = "local-db";

/// Durable partition and broadcast scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Database name
    pub db_name: String,
    /// Store (object store / table) name
    pub store_name: String,
}

impl Namespace {
    /// Create a namespace
    pub fn new(db_name: impl Into<String>, store_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            store_name: store_name.into(),
        }
    }

    /// Name of the broadcast channel shared by every record in this namespace.
    ///
    /// Components are length-prefixed so that `("a:b", "c")` and `("a", "b:c")`
    /// never collide.
    pub fn channel_name(&self) -> String {
        format!(
            "localdb:{}:{}:{}:{}",
            self.db_name.len(),
            self.db_name,
            self.store_name.len(),
            self.store_name
        )
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE_PART, DEFAULT_NAMESPACE_PART)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.db_name, self.store_name)
    }
}

/// Registry lookup key for one store record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreIdentity {
    /// Namespace the key lives in
    pub namespace: Namespace,
    /// Logical key chosen by the application
    pub key: String,
}

impl StoreIdentity {
    /// Create an identity from its three components
    pub fn new(
        db_name: impl Into<String>,
        store_name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Namespace::new(db_name, store_name),
            key: key.into(),
        }
    }

    /// Identity in the default namespace
    pub fn with_default_namespace(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::default(),
            key: key.into(),
        }
    }

    pub fn db_name(&self) -> &str {
        &self.namespace.db_name
    }

    pub fn store_name(&self) -> &str {
        &self.namespace.store_name
    }
}

impl fmt::Display for StoreIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}
