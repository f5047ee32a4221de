//! # Durable Store Driver
//!
//! Lazily opens and caches one partition handle per namespace. Every failure
//! is logged and degraded: an open failure makes the namespace permanently
//! absent for this driver, a read failure reads as absent, a write failure is
//! dropped.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::backend::{DurableBackend, DurableStore};
use crate::identity::Namespace;

/// Cached slot: `None` records that opening failed
type Handle = Option<Arc<dyn DurableStore>>;

#[derive(Debug)]
pub struct DurableDriver {
    backend: Option<Arc<dyn DurableBackend>>,
    handles: Mutex<HashMap<Namespace, Handle>>,
}

impl DurableDriver {
    /// Driver over `backend`, opening partitions lazily
    pub fn new(backend: Arc<dyn DurableBackend>) -> Self {
        Self {
            backend: Some(backend),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// A driver with no storage capability
    pub fn disabled() -> Self {
        Self {
            backend: None,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a backend is configured
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    async fn handle(&self, namespace: &Namespace) -> Handle {
        let backend = self.backend.as_ref()?;

        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.get(namespace) {
            return handle.clone();
        }

        let handle = match backend.open(namespace).await {
            Ok(store) => {
                debug!(namespace = %namespace, "opened durable partition");
                Some(store)
            }
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "durable storage unavailable");
                None
            }
        };
        handles.insert(namespace.clone(), handle.clone());
        handle
    }

    /// Read `key`; any failure reads as absent.
    pub async fn get(&self, namespace: &Namespace, key: &str) -> Option<Value> {
        let store = self.handle(namespace).await?;
        match store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(namespace = %namespace, key, error = %e, "durable read failed, treating as absent");
                None
            }
        }
    }

    /// Persist `value` under `key`, deleting when absent. Failures are dropped.
    pub async fn write(&self, namespace: &Namespace, key: &str, value: Option<&Value>) {
        let Some(store) = self.handle(namespace).await else {
            return;
        };
        let result = match value {
            Some(value) => store.put(key, value).await,
            None => store.delete(key).await,
        };
        if let Err(e) = result {
            warn!(namespace = %namespace, key, error = %e, "durable write dropped");
        }
    }

    /// Forget every cached handle
    pub async fn clear(&self) {
        self.handles.lock().await.clear();
    }
}
