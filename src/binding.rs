//! # Reactive Binding
//!
//! Per-consumer glue between a [`StoreRecord`] and rendering code. A binding
//! subscribes a render callback, starts hydration, decodes the record's
//! snapshot into `T` and routes writes back through the record.
//!
//! [`Binding::current`] returns the same `Arc` until the record changes, so
//! a renderer comparing by pointer never re-renders spuriously.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::registry::{ListenerId, StoreRecord};
use crate::value::Snapshot;

/// What a consumer sees
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    /// Hydration has not resolved yet
    Loading,
    /// Nothing stored
    Absent,
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }
}

type Cached<T> = Option<(Arc<Snapshot>, Arc<Loadable<T>>)>;

pub struct Binding<T> {
    record: Arc<StoreRecord>,
    listener: ListenerId,
    cache: Mutex<Cached<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Binding<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Subscribe `render` to `record` and trigger hydration.
    ///
    /// Outside an async runtime hydration is deferred until the record is
    /// hydrated again from inside one; until then the binding is `Loading`.
    pub fn new<F>(record: Arc<StoreRecord>, render: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener = record.subscribe(render);
        record.hydrate();
        Self {
            record,
            listener,
            cache: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// The shared record behind this binding
    pub fn record(&self) -> &Arc<StoreRecord> {
        &self.record
    }

    /// Current value, pointer-stable between record changes
    pub fn current(&self) -> Arc<Loadable<T>> {
        let snapshot = self.record.snapshot();
        let mut cache = match self.cache.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some((seen, decoded)) = cache.as_ref() {
            if Arc::ptr_eq(seen, &snapshot) {
                return Arc::clone(decoded);
            }
        }

        let decoded = Arc::new(self.decode(&snapshot));
        *cache = Some((snapshot, Arc::clone(&decoded)));
        decoded
    }

    fn decode(&self, snapshot: &Snapshot) -> Loadable<T> {
        match snapshot {
            Snapshot::Hydrating => Loadable::Loading,
            Snapshot::Absent => Loadable::Absent,
            Snapshot::Present(value) => match T::deserialize(value) {
                Ok(decoded) => Loadable::Ready(decoded),
                Err(e) => {
                    // Another consumer created the record with a looser schema.
                    warn!(store = %self.record.identity(), error = %e, "stored value does not decode");
                    Loadable::Absent
                }
            },
        }
    }

    /// Write through the record; `None` stores absence
    pub fn set_value(&self, next: Option<T>) {
        let encoded = match next.as_ref().map(serde_json::to_value).transpose() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(store = %self.record.identity(), error = %e, "value not encodable, using repair target");
                self.record.repair_target().cloned()
            }
        };
        self.record.set_value(encoded);
    }

    pub fn set(&self, value: T) {
        self.set_value(Some(value));
    }

    pub fn clear(&self) {
        self.set_value(None);
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        self.record.unsubscribe(self.listener);
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("record", &self.record.identity())
            .field("listener", &self.listener)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LocalDbOptions;
    use crate::registry::Registry;
    use crate::schema::TypedSchema;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        dark: bool,
    }

    #[tokio::test]
    async fn test_loading_then_ready() {
        let registry = Registry::in_memory();
        let options = LocalDbOptions::new("prefs").with_initial_value(Prefs { dark: false });
        let binding = registry.bind(&options, TypedSchema::<Prefs>::new(), || {});

        assert!(binding.current().is_loading());

        registry.settle().await;
        assert_eq!(binding.current().ready(), Some(&Prefs { dark: false }));
    }

    #[tokio::test]
    async fn test_current_is_pointer_stable() {
        let registry = Registry::in_memory();
        let options = LocalDbOptions::<Prefs>::new("prefs");
        let binding = registry.bind(&options, TypedSchema::new(), || {});
        registry.settle().await;

        let first = binding.current();
        assert!(Arc::ptr_eq(&first, &binding.current()));
        assert_eq!(*first, Loadable::Absent);

        binding.set(Prefs { dark: true });
        let second = binding.current();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &binding.current()));
        registry.settle().await;
    }

    #[tokio::test]
    async fn test_render_called_and_dropped() {
        let registry = Registry::in_memory();
        let renders = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&renders);
        let options = LocalDbOptions::<Prefs>::new("prefs");

        let binding = registry.bind(&options, TypedSchema::new(), move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        registry.settle().await;
        assert_eq!(renders.load(Ordering::SeqCst), 1);

        binding.set(Prefs { dark: true });
        assert_eq!(renders.load(Ordering::SeqCst), 2);

        let record = Arc::clone(binding.record());
        drop(binding);
        assert_eq!(record.listener_count(), 0);
        registry.settle().await;
    }

    #[tokio::test]
    async fn test_clear_stores_absence() {
        let registry = Registry::in_memory();
        let options = LocalDbOptions::<Prefs>::new("prefs");
        let binding = registry.bind(&options, TypedSchema::new(), || {});
        registry.settle().await;

        binding.set(Prefs { dark: true });
        binding.clear();
        assert_eq!(*binding.current(), Loadable::Absent);
        registry.settle().await;
    }
}
