//! localdb - per-key client-side persistence with validation and cross-context sync
//!
//! A [`Registry`] hands out one shared [`StoreRecord`] per
//! (database, store, key). Records hydrate from a durable backend, repair
//! values that fail their schema, and broadcast changes to other contexts
//! sharing the same transport. [`Binding`] adapts a record for rendering code.

pub mod binding;
pub mod broadcast;
pub mod cli;
pub mod durable;
pub mod identity;
pub mod options;
pub mod registry;
pub mod schema;
pub mod value;

pub use binding::{Binding, Loadable};
pub use identity::{Namespace, StoreIdentity, DEFAULT_NAMESPACE_PART};
pub use options::LocalDbOptions;
pub use registry::{ExecutionContext, ListenerId, Registry, RegistryBuilder, StoreRecord};
pub use schema::{AcceptAll, ObjectSchema, Schema, TypedSchema};
pub use value::{deep_equal, Equality, Slot, Snapshot};
