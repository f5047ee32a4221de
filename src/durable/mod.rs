//! # Durable Storage
//!
//! Per-namespace key/value partitions holding one JSON value per logical key.
//!
//! - [`DurableBackend`] / [`DurableStore`]: the collaborator traits
//! - [`DurableDriver`]: cached, failure-absorbing access used by records
//! - [`MemoryBackend`]: process-shared in-memory partitions
//! - [`FileBackend`]: one JSON file per key

mod backend;
mod driver;
mod errors;
mod file;
mod memory;

pub use backend::{DurableBackend, DurableStore};
pub use driver::DurableDriver;
pub use errors::{DurableError, DurableResult};
pub use file::{FileBackend, FileStore};
pub use memory::{MemoryBackend, MemoryStore};
