//! # Shared Store Registry
//!
//! Maps each [`StoreIdentity`] to exactly one [`StoreRecord`], so every
//! consumer of a key shares one in-memory value and one set of pending side
//! effects.
//!
//! The registry is an explicit object. Contexts that should synchronize
//! share a durable backend and a broadcast transport, not a registry.
//!
//! ## Invariants
//!
//! - At most one record per identity until [`Registry::teardown`]
//! - Creation is first-writer-wins: the initial value, schema and equality
//!   of later requests for an existing identity are ignored

mod context;
mod record;
mod tasks;

pub use context::ExecutionContext;
pub use record::{Listener, ListenerId, StoreRecord};
pub use tasks::DetachedTasks;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::binding::Binding;
use crate::broadcast::{BroadcastDriver, BroadcastTransport, LocalBus};
use crate::durable::{DurableBackend, DurableDriver, MemoryBackend};
use crate::identity::StoreIdentity;
use crate::options::LocalDbOptions;
use crate::schema::{Schema, TypedSchema};
use crate::value::{deep_equal, Equality, Slot};

/// Capabilities shared by every record of a registry
#[derive(Debug)]
pub(crate) struct Environment {
    pub(crate) context: ExecutionContext,
    pub(crate) durable: DurableDriver,
    pub(crate) broadcast: BroadcastDriver,
    pub(crate) tasks: DetachedTasks,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    context: ExecutionContext,
    durable: Option<Arc<dyn DurableBackend>>,
    broadcast: Option<Arc<dyn BroadcastTransport>>,
}

impl RegistryBuilder {
    /// Execution context, interactive by default
    pub fn context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Backend for durable storage; none means records never persist
    pub fn durable_backend(mut self, backend: Arc<dyn DurableBackend>) -> Self {
        self.durable = Some(backend);
        self
    }

    /// Transport for cross-context broadcasts; none means no sync
    pub fn broadcast_transport(mut self, transport: Arc<dyn BroadcastTransport>) -> Self {
        self.broadcast = Some(transport);
        self
    }

    /// Missing capabilities, and every capability in a headless context,
    /// become null drivers.
    pub fn build(self) -> Registry {
        let interactive = self.context.is_interactive();
        let durable = match self.durable {
            Some(backend) if interactive => DurableDriver::new(backend),
            _ => DurableDriver::disabled(),
        };
        let broadcast = match self.broadcast {
            Some(transport) if interactive => BroadcastDriver::new(transport),
            _ => BroadcastDriver::disabled(),
        };

        Registry {
            env: Arc::new(Environment {
                context: self.context,
                durable,
                broadcast,
                tasks: DetachedTasks::new(),
            }),
            records: Mutex::new(HashMap::new()),
        }
    }
}

#[derive(Debug)]
pub struct Registry {
    env: Arc<Environment>,
    records: Mutex<HashMap<StoreIdentity, Arc<StoreRecord>>>,
}

impl Registry {
    /// Start configuring a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Interactive registry over a fresh memory backend and bus
    pub fn in_memory() -> Self {
        Self::builder()
            .durable_backend(Arc::new(MemoryBackend::new()))
            .broadcast_transport(Arc::new(LocalBus::new()))
            .build()
    }

    /// Execution context the registry was built for
    pub fn context(&self) -> ExecutionContext {
        self.env.context
    }

    fn records(&self) -> MutexGuard<'_, HashMap<StoreIdentity, Arc<StoreRecord>>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Return the record for `identity`, creating it in `Hydrating` with
    /// `initial_value` as repair target when none exists.
    pub fn get_or_create(
        &self,
        identity: StoreIdentity,
        initial_value: Slot,
        schema: Arc<dyn Schema>,
        equals: Equality,
    ) -> Arc<StoreRecord> {
        let mut records = self.records();
        if let Some(record) = records.get(&identity) {
            return Arc::clone(record);
        }

        debug!(store = %identity, "creating store record");
        let record = Arc::new(StoreRecord::new(
            identity.clone(),
            initial_value,
            schema,
            equals,
            Arc::clone(&self.env),
        ));
        records.insert(identity, Arc::clone(&record));
        record
    }

    /// Record for a set of options, compared with [`deep_equal`]
    pub fn open<S>(&self, options: &LocalDbOptions, schema: S) -> Arc<StoreRecord>
    where
        S: Schema + 'static,
    {
        self.get_or_create(
            options.identity(),
            options.initial_slot(),
            Arc::new(schema),
            deep_equal,
        )
    }

    /// Typed binding with `render` subscribed; starts hydration
    pub fn bind<T, F>(
        &self,
        options: &LocalDbOptions<T>,
        schema: TypedSchema<T>,
        render: F,
    ) -> Binding<T>
    where
        T: Serialize + DeserializeOwned + 'static,
        F: Fn() + Send + Sync + 'static,
    {
        let record = self.get_or_create(
            options.identity(),
            options.initial_slot(),
            Arc::new(schema),
            deep_equal,
        );
        Binding::new(record, render)
    }

    /// Existing record, without creating one
    pub fn get(&self, identity: &StoreIdentity) -> Option<Arc<StoreRecord>> {
        self.records().get(identity).cloned()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether no record exists
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Side-effect tasks in flight
    pub fn pending_tasks(&self) -> usize {
        self.env.tasks.pending()
    }

    /// Wait for every detached side effect spawned so far to finish
    pub async fn settle(&self) {
        self.env.tasks.settle().await;
    }

    /// Unsubscribe every record from its channel, close channels, forget
    /// durable handles and drop all records.
    ///
    /// Records still held elsewhere keep working in memory but no longer
    /// receive broadcasts.
    pub async fn teardown(&self) {
        let records: Vec<Arc<StoreRecord>> = self.records().drain().map(|(_, r)| r).collect();
        for record in &records {
            record.detach();
        }
        self.env.broadcast.close_all();
        self.env.durable.clear().await;
        debug!(records = records.len(), "registry torn down");
    }
}
