//! # In-Memory Transport
//!
//! One `tokio::sync::broadcast` channel per topic. Suitable for a single
//! process and for tests; fault switches simulate a lossy network.

use crate::subscriber::Subscription;
use crate::transport::{Transport, TransportError};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// In-memory implementation of [`Transport`].
pub struct InMemoryTransport {
    /// Broadcast sender per topic.
    topics: RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>,

    /// Active subscription count by topic.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Extra copies delivered per publish.
    redelivery: AtomicUsize,

    /// When set, publish and subscribe fail.
    offline: AtomicBool,

    /// Channel capacity per topic.
    capacity: usize,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            messages_published: AtomicU64::new(0),
            redelivery: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            capacity,
        }
    }

    /// Deliver every published message `1 + copies` times.
    pub fn set_redelivery(&self, copies: usize) {
        self.redelivery.store(copies, Ordering::SeqCst);
    }

    /// Make the network unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Inject raw bytes on `topic` as if a remote peer had published them.
    pub fn inject(&self, topic: &str, payload: Vec<u8>) -> usize {
        self.sender(topic).send(payload).unwrap_or(0)
    }

    /// Number of live subscriptions on `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscriptions.read().get(topic).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        if let Some(sender) = self.topics.read().get(topic) {
            return sender.clone();
        }
        self.topics
            .write()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn ensure_online(&self) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("in-memory network is offline".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        ephemeral: bool,
    ) -> Result<(), TransportError> {
        self.ensure_online()?;
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        let sender = self.sender(topic);
        let copies = 1 + self.redelivery.load(Ordering::SeqCst);
        let mut receivers = 0;
        for _ in 0..copies {
            // No receivers: the message is dropped, as on a real network
            receivers = sender.send(payload.clone()).unwrap_or(0);
        }

        debug!(topic, ephemeral, receivers, copies, "Message published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        self.ensure_online()?;
        let receiver = self.sender(topic).subscribe();

        *self.subscriptions.write().entry(topic.to_string()).or_insert(0) += 1;
        debug!(topic, "New subscription created");

        let subscriptions = Arc::clone(&self.subscriptions);
        let key = topic.to_string();
        Ok(Subscription::from_broadcast(topic, receiver).on_drop(move || {
            let mut subs = subscriptions.write();
            if let Some(count) = subs.get_mut(&key) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    subs.remove(&key);
                }
            }
        }))
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}
