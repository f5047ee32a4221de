//! # In-Process Bus
//!
//! Channels of the same name opened from any clone of a [`LocalBus`] share
//! one subscriber set, the way same-origin browser contexts share a named
//! channel. Handlers run synchronously inside `post`, the sender's own
//! handlers included.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::errors::{BroadcastError, BroadcastResult};
use super::transport::{BroadcastChannel, BroadcastTransport, MessageHandler, SubscriptionId};

/// Bus limits
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Maximum encoded message size in bytes
    pub max_message_size: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_message_size: 65536, // 64KB
        }
    }
}

/// Subscribers of one channel name
#[derive(Default)]
struct Topic {
    subscribers: RwLock<HashMap<SubscriptionId, MessageHandler>>,
}

impl Topic {
    fn handlers(&self) -> Vec<MessageHandler> {
        self.subscribers
            .read()
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default()
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Shared in-process transport; clones share topics
#[derive(Debug, Clone, Default)]
pub struct LocalBus {
    topics: Arc<RwLock<HashMap<String, Arc<Topic>>>>,
    config: BusConfig,
}

impl LocalBus {
    /// Create a bus with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus with custom limits
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            topics: Arc::default(),
            config,
        }
    }

    fn topic(&self, name: &str) -> BroadcastResult<Arc<Topic>> {
        let mut topics = self
            .topics
            .write()
            .map_err(|_| BroadcastError::Internal("Lock poisoned".into()))?;
        Ok(Arc::clone(topics.entry(name.to_string()).or_default()))
    }

    /// Handlers currently subscribed under `name`, across all contexts
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.topics
            .read()
            .ok()
            .and_then(|t| t.get(name).map(|topic| topic.subscriber_count()))
            .unwrap_or(0)
    }
}

impl BroadcastTransport for LocalBus {
    fn open(&self, channel_name: &str) -> BroadcastResult<Arc<dyn BroadcastChannel>> {
        Ok(Arc::new(LocalChannel {
            name: channel_name.to_string(),
            topic: self.topic(channel_name)?,
            owned: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            max_message_size: self.config.max_message_size,
        }))
    }
}

/// One context's handle on a named topic
#[derive(Debug)]
pub struct LocalChannel {
    name: String,
    topic: Arc<Topic>,
    /// Subscriptions made through this handle
    owned: Mutex<HashSet<SubscriptionId>>,
    closed: AtomicBool,
    max_message_size: usize,
}

impl BroadcastChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn post(&self, message: &Value) -> BroadcastResult<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BroadcastError::ChannelClosed(self.name.clone()));
        }

        let size = serde_json::to_vec(message)
            .map(|bytes| bytes.len())
            .map_err(|e| BroadcastError::InvalidMessage(e.to_string()))?;
        if size > self.max_message_size {
            return Err(BroadcastError::MessageTooLarge(self.max_message_size));
        }

        // Handlers run without the topic lock so they may subscribe or post.
        let handlers = self.topic.handlers();
        for handler in &handlers {
            handler(message);
        }
        Ok(handlers.len())
    }

    fn subscribe(&self, handler: MessageHandler) -> BroadcastResult<SubscriptionId> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BroadcastError::ChannelClosed(self.name.clone()));
        }

        let id = Uuid::new_v4();
        let mut subs = self
            .topic
            .subscribers
            .write()
            .map_err(|_| BroadcastError::Internal("Lock poisoned".into()))?;
        subs.insert(id, handler);

        if let Ok(mut owned) = self.owned.lock() {
            owned.insert(id);
        }
        Ok(id)
    }

    fn unsubscribe(&self, id: &SubscriptionId) {
        if let Ok(mut subs) = self.topic.subscribers.write() {
            subs.remove(id);
        }
        if let Ok(mut owned) = self.owned.lock() {
            owned.remove(id);
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let owned: Vec<SubscriptionId> = self
            .owned
            .lock()
            .map(|mut o| o.drain().collect())
            .unwrap_or_default();
        if let Ok(mut subs) = self.topic.subscribers.write() {
            for id in &owned {
                subs.remove(id);
            }
        }
    }
}
