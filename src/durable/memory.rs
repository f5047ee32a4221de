//! # In-Memory Durable Backend
//!
//! A process-wide map of partitions. Every registry built on a clone of the
//! same [`MemoryBackend`] sees the same data, the way every tab of an origin
//! sees the same browser storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::backend::{DurableBackend, DurableStore};
use super::errors::{DurableError, DurableResult};
use crate::identity::Namespace;

/// Failure switches shared by every partition of a backend
#[derive(Debug, Default)]
struct Faults {
    open: AtomicBool,
    read: AtomicBool,
    write: AtomicBool,
}

/// One in-memory partition
#[derive(Debug)]
pub struct MemoryStore {
    namespace: Namespace,
    entries: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
    faults: Arc<Faults>,
}

impl MemoryStore {
    fn new(namespace: Namespace, faults: Arc<Faults>) -> Self {
        Self {
            namespace,
            entries: RwLock::new(HashMap::new()),
            writes: AtomicUsize::new(0),
            faults,
        }
    }

    /// Current stored value, bypassing fault injection
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Seed a value without counting it as a write
    pub fn seed(&self, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value);
        }
    }

    /// Number of successful puts and deletes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Namespace this partition belongs to
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> DurableResult<Option<Value>> {
        if self.faults.read.load(Ordering::SeqCst) {
            return Err(DurableError::read_failed(key, "injected read failure"));
        }
        let entries = self
            .entries
            .read()
            .map_err(|_| DurableError::read_failed(key, "lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &Value) -> DurableResult<()> {
        if self.faults.write.load(Ordering::SeqCst) {
            return Err(DurableError::write_failed(key, "injected write failure"));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| DurableError::write_failed(key, "lock poisoned"))?;
        entries.insert(key.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> DurableResult<()> {
        if self.faults.write.load(Ordering::SeqCst) {
            return Err(DurableError::write_failed(key, "injected write failure"));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| DurableError::write_failed(key, "lock poisoned"))?;
        entries.remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Shared in-memory backend; clones share partitions
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    partitions: Arc<RwLock<HashMap<Namespace, Arc<MemoryStore>>>>,
    faults: Arc<Faults>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the partition for `namespace`
    pub fn partition(&self, namespace: &Namespace) -> Arc<MemoryStore> {
        if let Ok(partitions) = self.partitions.read() {
            if let Some(store) = partitions.get(namespace) {
                return Arc::clone(store);
            }
        }

        let mut partitions = match self.partitions.write() {
            Ok(p) => p,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(partitions.entry(namespace.clone()).or_insert_with(|| {
            Arc::new(MemoryStore::new(namespace.clone(), Arc::clone(&self.faults)))
        }))
    }

    /// Make subsequent opens fail
    pub fn fail_opens(&self, fail: bool) {
        self.faults.open.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent reads fail
    pub fn fail_reads(&self, fail: bool) {
        self.faults.read.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent puts and deletes fail
    pub fn fail_writes(&self, fail: bool) {
        self.faults.write.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DurableBackend for MemoryBackend {
    async fn open(&self, namespace: &Namespace) -> DurableResult<Arc<dyn DurableStore>> {
        if self.faults.open.load(Ordering::SeqCst) {
            return Err(DurableError::open_failed(namespace, "injected open failure"));
        }
        Ok(self.partition(namespace))
    }
}
