//! # Store Record
//!
//! The shared state for one [`StoreIdentity`].
//!
//! ## State machine
//!
//! ```text
//! Hydrating ──(hydrate | set_value | broadcast)──> Ready(absent | value)
//! Ready ──(set_value | broadcast)──> Ready
//! ```
//!
//! `Ready` never returns to `Hydrating`. Every value that enters `Ready` has
//! passed the schema or been replaced by the repair target. The repair target
//! itself is trusted and never validated.
//!
//! In-memory transitions and listener notification happen synchronously.
//! Durable reads and writes and broadcasts run as detached tasks whose
//! failures never reach the caller.
//!
//! ## Write ordering
//!
//! Every transition bumps a generation counter. Side-effect tasks of one
//! record run one at a time under an async write lock, and a task whose
//! generation is no longer current skips its write and broadcast: the newer
//! value has its own task queued behind it. Storage and other contexts
//! therefore end on the last value this record assigned.
//!
//! A broadcast the record posts itself and receives back synchronously on
//! the posting thread is ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::tasks::DetachedTasks;
use super::Environment;
use crate::broadcast::{BroadcastMessage, ChannelSubscription, MessageHandler};
use crate::identity::StoreIdentity;
use crate::schema::Schema;
use crate::value::{normalize, Equality, Slot, Snapshot};

/// Change callback
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle for removing a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct StoreRecord {
    identity: StoreIdentity,
    repair_target: Slot,
    schema: Arc<dyn Schema>,
    equals: Equality,

    current: Mutex<Arc<Snapshot>>,
    /// Bumped on every transition, under the `current` lock
    generation: AtomicU64,
    /// Set once hydration has been dispatched
    hydrated: AtomicBool,
    /// Serializes durable writes and broadcasts
    writes: tokio::sync::Mutex<()>,
    /// Thread currently posting this record's broadcast
    publishing: Mutex<Option<ThreadId>>,

    listeners: Mutex<HashMap<ListenerId, Listener>>,
    next_listener: AtomicU64,

    channel: Mutex<Option<ChannelSubscription>>,
    env: Arc<Environment>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl StoreRecord {
    pub(crate) fn new(
        identity: StoreIdentity,
        repair_target: Slot,
        schema: Arc<dyn Schema>,
        equals: Equality,
        env: Arc<Environment>,
    ) -> Self {
        Self {
            identity,
            repair_target: normalize(repair_target),
            schema,
            equals,
            current: Mutex::new(Arc::new(Snapshot::Hydrating)),
            generation: AtomicU64::new(0),
            hydrated: AtomicBool::new(false),
            writes: tokio::sync::Mutex::new(()),
            publishing: Mutex::new(None),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(0),
            channel: Mutex::new(None),
            env,
        }
    }

    pub fn identity(&self) -> &StoreIdentity {
        &self.identity
    }

    /// Value substituted for anything that fails validation
    pub fn repair_target(&self) -> Option<&Value> {
        self.repair_target.as_ref()
    }

    /// Current value. The same `Arc` is returned until the next transition.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&lock(&self.current))
    }

    /// Whether hydration has been dispatched (not necessarily finished)
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Whether a broadcast subscription is live
    pub fn is_listening(&self) -> bool {
        lock(&self.channel).is_some()
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        lock(&self.listeners).insert(id, Arc::new(listener));
        id
    }

    /// Returns whether the listener was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        lock(&self.listeners).remove(&id).is_some()
    }

    /// Load from durable storage once and start listening for broadcasts.
    ///
    /// Later calls are no-ops. In a headless context the record stays
    /// `Hydrating`. In an interactive context without an async runtime
    /// nothing happens and a later call from inside a runtime hydrates.
    pub fn hydrate(self: &Arc<Self>) {
        if self.is_hydrated() {
            return;
        }
        let interactive = self.env.context.is_interactive();
        if interactive && !DetachedTasks::has_runtime() {
            warn!(store = %self.identity, "no async runtime, hydration deferred");
            return;
        }
        if self.hydrated.swap(true, Ordering::SeqCst) {
            return;
        }
        if !interactive {
            debug!(store = %self.identity, "headless context, hydration skipped");
            return;
        }

        self.listen();

        let record = Arc::clone(self);
        self.env.tasks.spawn("hydrate", async move {
            record.load().await;
        });
    }

    /// Validate, repair and assign `next`, then persist and broadcast it.
    ///
    /// Equal values are a no-op. Invalid values become the repair target.
    /// Listeners are notified before any I/O is issued.
    pub fn set_value(self: &Arc<Self>, next: Slot) {
        let next = self.repair(normalize(next));
        let Some(generation) = self.assign_if_changed(next.clone()) else {
            trace!(store = %self.identity, "set_value unchanged");
            return;
        };
        self.notify();

        if !self.env.durable.is_available() && !self.env.broadcast.is_available() {
            return;
        }

        let record = Arc::clone(self);
        self.env.tasks.spawn("persist", async move {
            record.persist(generation, next).await;
        });
    }

    /// Drop the broadcast subscription
    pub(crate) fn detach(&self) {
        let subscription = lock(&self.channel).take();
        drop(subscription);
    }

    fn listen(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let handler: MessageHandler = Arc::new(move |raw: &Value| {
            if let Some(record) = weak.upgrade() {
                record.receive(raw);
            }
        });

        if let Some(subscription) = self
            .env
            .broadcast
            .subscribe(&self.identity.namespace, handler)
        {
            *lock(&self.channel) = Some(subscription);
        }
    }

    async fn load(&self) {
        let namespace = &self.identity.namespace;
        let persisted = normalize(self.env.durable.get(namespace, &self.identity.key).await);

        let resolved = match &persisted {
            Some(value) => self.repair(Some(value.clone())),
            None => self.repair_target.clone(),
        };

        let generation = {
            let mut current = lock(&self.current);
            if !current.is_hydrating() {
                // A local or remote change landed first and is newer.
                debug!(store = %self.identity, "hydration superseded");
                return;
            }
            *current = Arc::new(Snapshot::from_slot(resolved.clone()));
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        debug!(store = %self.identity, present = resolved.is_some(), "hydrated");
        self.notify();

        if (self.equals)(persisted.as_ref(), resolved.as_ref()) {
            return;
        }
        let _writes = self.writes.lock().await;
        if !self.is_current(generation) {
            debug!(store = %self.identity, "write-back superseded");
            return;
        }
        debug!(store = %self.identity, "writing back repaired value");
        self.env
            .durable
            .write(namespace, &self.identity.key, resolved.as_ref())
            .await;
    }

    /// Write `next` and announce it, unless a newer transition happened.
    async fn persist(&self, generation: u64, next: Slot) {
        let _writes = self.writes.lock().await;
        if !self.is_current(generation) {
            trace!(store = %self.identity, generation, "persist superseded");
            return;
        }
        let namespace = &self.identity.namespace;
        self.env
            .durable
            .write(namespace, &self.identity.key, next.as_ref())
            .await;

        if !self.is_current(generation) {
            trace!(store = %self.identity, generation, "broadcast superseded");
            return;
        }
        let _publishing = PublishingGuard::enter(&self.publishing);
        self.env.broadcast.send(
            namespace,
            &BroadcastMessage::change(self.identity.key.clone(), next),
        );
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn receive(&self, raw: &Value) {
        if *lock(&self.publishing) == Some(thread::current().id()) {
            return;
        }
        let Some(message) = BroadcastMessage::parse(raw) else {
            trace!(store = %self.identity, "ignoring malformed broadcast");
            return;
        };
        if message.key != self.identity.key {
            return;
        }

        let incoming = if message.removed {
            self.repair_target.clone()
        } else {
            self.repair(normalize(message.value))
        };

        if self.assign_if_changed(incoming).is_some() {
            debug!(store = %self.identity, "applied broadcast change");
            self.notify();
        }
    }

    fn repair(&self, candidate: Slot) -> Slot {
        match candidate {
            None => None,
            Some(value) if self.schema.validate(&value) => Some(value),
            Some(_) => {
                debug!(store = %self.identity, "value failed validation, using repair target");
                self.repair_target.clone()
            }
        }
    }

    /// Assign unless equal to a resolved current value and return the new
    /// generation. Hydrating never compares equal.
    fn assign_if_changed(&self, next: Slot) -> Option<u64> {
        let mut current = lock(&self.current);
        if let Some(slot) = current.slot() {
            if (self.equals)(slot, next.as_ref()) {
                return None;
            }
        }
        *current = Arc::new(Snapshot::from_slot(next));
        Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = lock(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener();
        }
    }
}

/// Marks the current thread as posting for one record
struct PublishingGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> PublishingGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Self(slot)
    }
}

impl Drop for PublishingGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

impl fmt::Debug for StoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRecord")
            .field("identity", &self.identity)
            .field("current", &self.snapshot())
            .field("repair_target", &self.repair_target)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("hydrated", &self.is_hydrated())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::schema::AcceptAll;
    use crate::durable::MemoryBackend;
    use crate::value::deep_equal;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn record(registry: &Registry, initial: Slot) -> Arc<StoreRecord> {
        registry.get_or_create(
            StoreIdentity::with_default_namespace("k"),
            initial,
            Arc::new(|v: &Value| v.as_i64().is_some_and(|n| n >= 0)),
            deep_equal,
        )
    }

    #[tokio::test]
    async fn test_set_value_notifies_synchronously() {
        let registry = Registry::in_memory();
        let rec = record(&registry, Some(json!(0)));

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        rec.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        rec.set_value(Some(json!(5)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*rec.snapshot(), Snapshot::Present(json!(5)));

        rec.set_value(Some(json!(5)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        registry.settle().await;
    }

    #[tokio::test]
    async fn test_invalid_value_becomes_repair_target() {
        let registry = Registry::in_memory();
        let rec = record(&registry, Some(json!(0)));

        rec.set_value(Some(json!(7)));
        rec.set_value(Some(json!(-1)));
        assert_eq!(*rec.snapshot(), Snapshot::Present(json!(0)));

        rec.set_value(Some(json!("nope")));
        assert_eq!(*rec.snapshot(), Snapshot::Present(json!(0)));
        registry.settle().await;
    }

    #[tokio::test]
    async fn test_absent_skips_validation() {
        let registry = Registry::in_memory();
        let rec = record(&registry, Some(json!(0)));

        rec.set_value(None);
        assert_eq!(*rec.snapshot(), Snapshot::Absent);
        rec.set_value(Some(Value::Null));
        assert_eq!(*rec.snapshot(), Snapshot::Absent);
        registry.settle().await;
    }

    #[tokio::test]
    async fn test_snapshot_pointer_stable_between_changes() {
        let registry = Registry::in_memory();
        let rec = registry.get_or_create(
            StoreIdentity::with_default_namespace("p"),
            None,
            Arc::new(AcceptAll),
            deep_equal,
        );

        let before = rec.snapshot();
        assert!(Arc::ptr_eq(&before, &rec.snapshot()));

        rec.set_value(Some(json!(1)));
        let after = rec.snapshot();
        assert!(!Arc::ptr_eq(&before, &after));

        rec.set_value(Some(json!(1.0)));
        assert!(Arc::ptr_eq(&after, &rec.snapshot()));
        registry.settle().await;
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let registry = Registry::in_memory();
        let rec = record(&registry, None);

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = rec.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(rec.listener_count(), 1);

        assert!(rec.unsubscribe(id));
        assert!(!rec.unsubscribe(id));
        rec.set_value(Some(json!(3)));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        registry.settle().await;
    }

    #[test]
    fn test_hydrate_without_runtime_is_deferred() {
        let registry = Registry::in_memory();
        let rec = record(&registry, Some(json!(1)));

        rec.hydrate();
        assert!(!rec.is_hydrated());
        assert!(rec.snapshot().is_hydrating());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            rec.hydrate();
            registry.settle().await;
        });
        assert!(rec.is_hydrated());
        assert_eq!(*rec.snapshot(), Snapshot::Present(json!(1)));
    }

    #[tokio::test]
    async fn test_distinct_writes_notify_once_each() {
        let registry = Registry::in_memory();
        let rec = record(&registry, None);
        rec.hydrate();
        registry.settle().await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observed = Arc::downgrade(&rec);
        rec.subscribe(move || {
            if let Some(rec) = observed.upgrade() {
                sink.lock().unwrap().push(rec.snapshot());
            }
        });

        rec.set_value(Some(json!(1)));
        rec.set_value(Some(json!(2)));
        registry.settle().await;

        let seen = seen.lock().unwrap();
        let values: Vec<&Snapshot> = seen.iter().map(|s| s.as_ref()).collect();
        assert_eq!(
            values,
            vec![&Snapshot::Present(json!(1)), &Snapshot::Present(json!(2))]
        );
        assert_eq!(*rec.snapshot(), Snapshot::Present(json!(2)));
    }

    #[tokio::test]
    async fn test_superseded_persist_is_skipped() {
        let backend = MemoryBackend::new();
        let registry = Registry::builder()
            .durable_backend(Arc::new(backend.clone()))
            .build();
        let rec = record(&registry, None);
        rec.hydrate();
        registry.settle().await;

        let store = backend.partition(&rec.identity().namespace);
        let before = store.write_count();
        for n in 1..=5 {
            rec.set_value(Some(json!(n)));
        }
        registry.settle().await;

        assert_eq!(store.write_count(), before + 1);
        assert_eq!(store.peek("k"), Some(json!(5)));
    }
}
