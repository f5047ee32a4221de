//! Fault Tolerance Tests
//!
//! Storage and messaging failures degrade capability, never correctness:
//! - A failing store reads as absent and drops writes
//! - A hanging store leaves the record hydrating without blocking writes
//! - Malformed or oversized messages are ignored
//! - An unavailable transport disables broadcasts only

use std::future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use localdb::broadcast::{
    BroadcastChannel, BroadcastError, BroadcastResult, BroadcastTransport, BusConfig, LocalBus,
};
use localdb::durable::{DurableBackend, DurableResult, DurableStore, MemoryBackend};
use localdb::{ExecutionContext, LocalDbOptions, Namespace, Registry, Snapshot};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn positive(value: &Value) -> bool {
    value.as_i64().is_some_and(|n| n > 0)
}

fn options() -> LocalDbOptions {
    LocalDbOptions::new("count").with_initial_value(json!(1))
}

fn registry_over(backend: Arc<dyn DurableBackend>, transport: Arc<dyn BroadcastTransport>) -> Registry {
    Registry::builder()
        .context(ExecutionContext::Interactive)
        .durable_backend(backend)
        .broadcast_transport(transport)
        .build()
}

/// Store whose reads never complete
#[derive(Debug)]
struct HangingStore;

#[async_trait]
impl DurableStore for HangingStore {
    async fn get(&self, _key: &str) -> DurableResult<Option<Value>> {
        future::pending().await
    }

    async fn put(&self, _key: &str, _value: &Value) -> DurableResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> DurableResult<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct HangingBackend;

#[async_trait]
impl DurableBackend for HangingBackend {
    async fn open(&self, _namespace: &Namespace) -> DurableResult<Arc<dyn DurableStore>> {
        Ok(Arc::new(HangingStore))
    }
}

/// Transport that is never available
#[derive(Debug)]
struct NoTransport;

impl BroadcastTransport for NoTransport {
    fn open(&self, _channel_name: &str) -> BroadcastResult<Arc<dyn BroadcastChannel>> {
        Err(BroadcastError::Unavailable("disabled by host".into()))
    }
}

// =============================================================================
// Durable Failure Tests
// =============================================================================

/// Failing to open storage hydrates to the initial value.
#[tokio::test]
async fn test_open_failure_reads_as_absent() {
    let backend = MemoryBackend::new();
    backend.fail_opens(true);
    let registry = registry_over(Arc::new(backend.clone()), Arc::new(LocalBus::new()));
    let namespace = options().identity().namespace;
    backend.partition(&namespace).seed("count", json!(9));

    let record = registry.open(&options(), positive);
    record.hydrate();
    registry.settle().await;
    assert_eq!(*record.snapshot(), Snapshot::Present(json!(1)));

    record.set_value(Some(json!(5)));
    registry.settle().await;
    assert_eq!(*record.snapshot(), Snapshot::Present(json!(5)));
    assert_eq!(backend.partition(&namespace).peek("count"), Some(json!(9)));
}

/// A failing read hydrates to the initial value; the write-back is attempted.
#[tokio::test]
async fn test_read_failure_reads_as_absent() {
    let backend = MemoryBackend::new();
    backend.fail_reads(true);
    let registry = registry_over(Arc::new(backend.clone()), Arc::new(LocalBus::new()));
    let store = backend.partition(&options().identity().namespace);
    store.seed("count", json!(9));

    let record = registry.open(&options(), positive);
    record.hydrate();
    registry.settle().await;

    assert_eq!(*record.snapshot(), Snapshot::Present(json!(1)));
    assert_eq!(store.peek("count"), Some(json!(1)));
}

/// Dropped writes leave the in-memory value and broadcasts intact.
#[tokio::test]
async fn test_write_failure_is_silent() {
    let backend = MemoryBackend::new();
    let bus = LocalBus::new();
    let registry = registry_over(Arc::new(backend.clone()), Arc::new(bus.clone()));
    let other = registry_over(Arc::new(backend.clone()), Arc::new(bus.clone()));

    let record = registry.open(&options(), positive);
    let remote = other.open(&options(), positive);
    record.hydrate();
    remote.hydrate();
    registry.settle().await;
    other.settle().await;

    backend.fail_writes(true);
    record.set_value(Some(json!(7)));
    registry.settle().await;

    assert_eq!(*record.snapshot(), Snapshot::Present(json!(7)));
    assert_eq!(*remote.snapshot(), Snapshot::Present(json!(7)));
    let store = backend.partition(&options().identity().namespace);
    assert_eq!(store.peek("count"), Some(json!(1)));
}

/// A read that never completes keeps the record hydrating, but writes land.
#[tokio::test]
async fn test_hanging_store_does_not_block_writes() {
    let registry = registry_over(Arc::new(HangingBackend), Arc::new(LocalBus::new()));
    let record = registry.open(&options(), positive);

    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notified);
    record.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    record.hydrate();
    tokio::task::yield_now().await;
    assert!(record.snapshot().is_hydrating());
    assert_eq!(registry.pending_tasks(), 1);

    record.set_value(Some(json!(3)));
    assert_eq!(*record.snapshot(), Snapshot::Present(json!(3)));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Messaging Failure Tests
// =============================================================================

/// Messages without the expected shape change nothing.
#[tokio::test]
async fn test_malformed_messages_ignored() {
    let bus = LocalBus::new();
    let registry = registry_over(Arc::new(MemoryBackend::new()), Arc::new(bus.clone()));
    let record = registry.open(&options(), positive);
    record.hydrate();
    registry.settle().await;

    let notified = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&notified);
    record.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let channel = bus.open(&options().identity().namespace.channel_name()).unwrap();
    for garbage in [
        json!("count"),
        json!(42),
        json!(null),
        json!({"value": 5, "removed": false}),
        json!({"key": 5, "value": 5, "removed": false}),
        json!({"key": "count", "value": 5}),
        json!({"key": "count", "value": 5, "removed": "no"}),
    ] {
        channel.post(&garbage).unwrap();
    }

    assert_eq!(*record.snapshot(), Snapshot::Present(json!(1)));
    assert_eq!(notified.load(Ordering::SeqCst), 0);
}

/// A message over the bus limit is dropped; the local change stands.
#[tokio::test]
async fn test_oversized_broadcast_dropped() {
    let backend = MemoryBackend::new();
    let bus = LocalBus::with_config(BusConfig {
        max_message_size: 64,
    });
    let sender = registry_over(Arc::new(backend.clone()), Arc::new(bus.clone()));
    let receiver = registry_over(Arc::new(backend.clone()), Arc::new(bus.clone()));
    let options = LocalDbOptions::new("notes");

    let local = sender.open(&options, |_: &Value| true);
    let remote = receiver.open(&options, |_: &Value| true);
    local.hydrate();
    remote.hydrate();
    sender.settle().await;
    receiver.settle().await;

    let long = "x".repeat(200);
    local.set_value(Some(json!(long)));
    sender.settle().await;

    assert_eq!(*local.snapshot(), Snapshot::Present(json!(long)));
    assert_eq!(*remote.snapshot(), Snapshot::Absent);
    let store = backend.partition(&options.identity().namespace);
    assert_eq!(store.peek("notes"), Some(json!(long)));
}

/// Without a transport the record still hydrates and persists.
#[tokio::test]
async fn test_unavailable_transport() {
    let backend = MemoryBackend::new();
    let registry = registry_over(Arc::new(backend.clone()), Arc::new(NoTransport));
    let record = registry.open(&options(), positive);
    record.hydrate();
    registry.settle().await;

    assert!(!record.is_listening());
    assert_eq!(*record.snapshot(), Snapshot::Present(json!(1)));

    record.set_value(Some(json!(4)));
    registry.settle().await;
    let store = backend.partition(&options().identity().namespace);
    assert_eq!(store.peek("count"), Some(json!(4)));
}
