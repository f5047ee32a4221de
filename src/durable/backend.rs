//! # Durable Backend Traits

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::errors::DurableResult;
use crate::identity::Namespace;

/// One opened durable partition, keyed by logical key
#[async_trait]
pub trait DurableStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`, `None` if nothing is stored
    async fn get(&self, key: &str) -> DurableResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &Value) -> DurableResult<()>;

    /// Remove `key`; removing a missing key succeeds
    async fn delete(&self, key: &str) -> DurableResult<()>;
}

/// Opens partitions by namespace
#[async_trait]
pub trait DurableBackend: Send + Sync + std::fmt::Debug {
    async fn open(&self, namespace: &Namespace) -> DurableResult<Arc<dyn DurableStore>>;
}
