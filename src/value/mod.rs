//! # Stored Values
//!
//! The tri-state read model of a store record and the equality contract used
//! for no-op detection and broadcast de-duplication.
//!
//! Payloads are plain JSON values. A JSON `null` entering the system is the
//! absence marker, never a payload; see [`normalize`].

mod equality;

pub use equality::{deep_equal, Equality};

use serde_json::Value;

/// A value slot: `None` is an explicitly stored non-value.
pub type Slot = Option<Value>;

/// Current value of a store record
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Not yet loaded from durable storage
    Hydrating,
    /// Loaded, nothing stored
    Absent,
    /// Loaded, validated payload
    Present(Value),
}

impl Snapshot {
    /// Build a ready snapshot from a slot
    pub fn from_slot(slot: Slot) -> Self {
        match normalize(slot) {
            Some(value) => Snapshot::Present(value),
            None => Snapshot::Absent,
        }
    }

    /// Whether hydration has not resolved yet
    pub fn is_hydrating(&self) -> bool {
        matches!(self, Snapshot::Hydrating)
    }

    /// The resolved slot, or `None` while hydrating
    pub fn slot(&self) -> Option<Option<&Value>> {
        match self {
            Snapshot::Hydrating => None,
            Snapshot::Absent => Some(None),
            Snapshot::Present(value) => Some(Some(value)),
        }
    }

    /// The payload, if present
    pub fn value(&self) -> Option<&Value> {
        match self {
            Snapshot::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Collapse JSON `null` into absence.
pub fn normalize(slot: Slot) -> Slot {
    match slot {
        Some(Value::Null) | None => None,
        some => some,
    }
}
