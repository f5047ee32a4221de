//! # Cross-Context Broadcast
//!
//! Best-effort, at-most-once change notifications between execution contexts
//! sharing a namespace.
//!
//! ## Architecture
//!
//! - **Transport** ([`BroadcastTransport`], [`BroadcastChannel`]): named channels
//! - **Driver** ([`BroadcastDriver`]): per-namespace channel cache, null object
//!   when messaging is unavailable
//! - **Message** ([`BroadcastMessage`]): `{ key, value, removed }`
//! - **Local bus** ([`LocalBus`]): in-process transport

mod driver;
mod errors;
mod local;
mod message;
mod transport;

pub use driver::{BroadcastDriver, ChannelSubscription};
pub use errors::{BroadcastError, BroadcastResult};
pub use local::{BusConfig, LocalBus, LocalChannel};
pub use message::BroadcastMessage;
pub use transport::{BroadcastChannel, BroadcastTransport, MessageHandler, SubscriptionId};
