//! # Channel Transport Traits

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::errors::BroadcastResult;

/// Identifies one handler registered on a channel
pub type SubscriptionId = Uuid;

/// Receives every message posted on a channel, including malformed ones
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// A named, cross-context message channel
pub trait BroadcastChannel: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Post to every subscriber of the channel name. Returns the number of
    /// handlers the message was handed to; delivery is best-effort.
    fn post(&self, message: &Value) -> BroadcastResult<usize>;

    fn subscribe(&self, handler: MessageHandler) -> BroadcastResult<SubscriptionId>;

    fn unsubscribe(&self, id: &SubscriptionId);

    /// Drop every handler registered through this channel and refuse
    /// further posts
    fn close(&self);
}

/// Opens channels by name
pub trait BroadcastTransport: Send + Sync + std::fmt::Debug {
    fn open(&self, channel_name: &str) -> BroadcastResult<Arc<dyn BroadcastChannel>>;
}
