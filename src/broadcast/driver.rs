//! # Broadcast Driver
//!
//! Opens and caches one channel per namespace. With no transport (headless
//! context) every operation is a no-op. A channel that fails to open is
//! remembered as absent and never retried.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace, warn};

use super::message::BroadcastMessage;
use super::transport::{BroadcastChannel, BroadcastTransport, MessageHandler, SubscriptionId};
use crate::identity::Namespace;

type Handle = Option<Arc<dyn BroadcastChannel>>;

#[derive(Debug)]
pub struct BroadcastDriver {
    transport: Option<Arc<dyn BroadcastTransport>>,
    channels: Mutex<HashMap<String, Handle>>,
}

impl BroadcastDriver {
    /// Driver over `transport`, opening channels lazily
    pub fn new(transport: Arc<dyn BroadcastTransport>) -> Self {
        Self {
            transport: Some(transport),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// A driver with no messaging capability
    pub fn disabled() -> Self {
        Self {
            transport: None,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a transport is configured
    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    fn channel(&self, namespace: &Namespace) -> Handle {
        let transport = self.transport.as_ref()?;
        let name = namespace.channel_name();

        let mut channels = match self.channels.lock() {
            Ok(c) => c,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = channels.get(&name) {
            return handle.clone();
        }

        let handle = match transport.open(&name) {
            Ok(channel) => {
                debug!(channel = %name, "opened broadcast channel");
                Some(channel)
            }
            Err(e) => {
                warn!(channel = %name, error = %e, "broadcast unavailable");
                None
            }
        };
        channels.insert(name, handle.clone());
        handle
    }

    /// Post a change message; failures are logged and dropped.
    pub fn send(&self, namespace: &Namespace, message: &BroadcastMessage) {
        let Some(channel) = self.channel(namespace) else {
            return;
        };
        match channel.post(&message.to_value()) {
            Ok(delivered) => {
                trace!(channel = channel.name(), key = %message.key, delivered, "broadcast sent")
            }
            Err(e) => {
                warn!(channel = channel.name(), key = %message.key, error = %e, "broadcast dropped")
            }
        }
    }

    /// Register `handler` on the namespace channel. `None` when messaging is
    /// unavailable.
    pub fn subscribe(
        &self,
        namespace: &Namespace,
        handler: MessageHandler,
    ) -> Option<ChannelSubscription> {
        let channel = self.channel(namespace)?;
        match channel.subscribe(handler) {
            Ok(id) => Some(ChannelSubscription { channel, id }),
            Err(e) => {
                warn!(channel = channel.name(), error = %e, "broadcast subscribe failed");
                None
            }
        }
    }

    /// Close and forget every cached channel
    pub fn close_all(&self) {
        let channels: Vec<Handle> = match self.channels.lock() {
            Ok(mut c) => c.drain().map(|(_, h)| h).collect(),
            Err(poisoned) => poisoned.into_inner().drain().map(|(_, h)| h).collect(),
        };
        for channel in channels.into_iter().flatten() {
            channel.close();
        }
    }
}

/// A live handler registration; unsubscribes when dropped
pub struct ChannelSubscription {
    channel: Arc<dyn BroadcastChannel>,
    id: SubscriptionId,
}

impl ChannelSubscription {
    /// Identifier of the registration on its channel
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl fmt::Debug for ChannelSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSubscription")
            .field("channel", &self.channel.name())
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.channel.unsubscribe(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{BroadcastError, BroadcastResult, LocalBus};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct RefusingTransport;

    impl BroadcastTransport for RefusingTransport {
        fn open(&self, channel_name: &str) -> BroadcastResult<Arc<dyn BroadcastChannel>> {
            Err(BroadcastError::Unavailable(channel_name.to_string()))
        }
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let bus = LocalBus::new();
        let driver = BroadcastDriver::new(Arc::new(bus.clone()));
        let ns = Namespace::default();

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sub = driver
            .subscribe(
                &ns,
                Arc::new(move |_: &Value| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        driver.send(&ns, &BroadcastMessage::change("k", Some(json!(1))));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        drop(sub);
        assert_eq!(bus.subscriber_count(&ns.channel_name()), 0);
        driver.send(&ns, &BroadcastMessage::change("k", Some(json!(2))));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unavailable_transport_is_null() {
        let driver = BroadcastDriver::new(Arc::new(RefusingTransport));
        let ns = Namespace::default();
        assert!(driver.subscribe(&ns, Arc::new(|_: &Value| {})).is_none());
        driver.send(&ns, &BroadcastMessage::change("k", None));

        let disabled = BroadcastDriver::disabled();
        assert!(!disabled.is_available());
        assert!(disabled.subscribe(&ns, Arc::new(|_: &Value| {})).is_none());
    }

    #[test]
    fn test_close_all() {
        let bus = LocalBus::new();
        let driver = BroadcastDriver::new(Arc::new(bus.clone()));
        let ns = Namespace::default();

        let sub = driver.subscribe(&ns, Arc::new(|_: &Value| {})).unwrap();
        assert_eq!(bus.subscriber_count(&ns.channel_name()), 1);

        driver.close_all();
        assert_eq!(bus.subscriber_count(&ns.channel_name()), 0);
        drop(sub);
    }
}
