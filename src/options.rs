//! Consumer-facing configuration surface
//!
//! ```json
//! { "key": "settings", "initialValue": {"fontSize": 16}, "dbName": "app", "storeName": "prefs" }
//! ```
//!
//! `dbName` and `storeName` default to `"local-db"`. `initialValue` defaults
//! to absent and only counts for the consumer that creates the record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::identity::{StoreIdentity, DEFAULT_NAMESPACE_PART};
use crate::value::{normalize, Slot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDbOptions<T = Value> {
    /// Logical key
    pub key: String,

    /// Repair target captured when the record is created
    #[serde(default)]
    pub initial_value: Option<T>,

    #[serde(default = "default_db_name")]
    pub db_name: String,

    #[serde(default = "default_store_name")]
    pub store_name: String,
}

fn default_db_name() -> String {
    DEFAULT_NAMESPACE_PART.to_string()
}

fn default_store_name() -> String {
    DEFAULT_NAMESPACE_PART.to_string()
}

impl<T> LocalDbOptions<T> {
    /// Options for `key` in the default namespace
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            initial_value: None,
            db_name: default_db_name(),
            store_name: default_store_name(),
        }
    }

    pub fn with_initial_value(mut self, value: T) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = store_name.into();
        self
    }

    /// Registry identity these options address
    pub fn identity(&self) -> StoreIdentity {
        StoreIdentity::new(&self.db_name, &self.store_name, &self.key)
    }
}

impl<T: Serialize> LocalDbOptions<T> {
    /// The initial value as a slot. A value that cannot be encoded counts as
    /// absent.
    pub fn initial_slot(&self) -> Slot {
        let value = self.initial_value.as_ref()?;
        match serde_json::to_value(value) {
            Ok(encoded) => normalize(Some(encoded)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "initial value not encodable, treating as absent");
                None
            }
        }
    }
}
