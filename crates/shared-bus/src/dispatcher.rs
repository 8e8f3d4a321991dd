//! # Message Dispatcher
//!
//! Typed pub/sub over a [`Transport`], scoped to one content topic.
//!
//! ## Delivery
//!
//! ```text
//! transport ──bytes──▶ decode ──▶ topic check ──▶ signature gate ──▶ seen cache
//!                                                                      │
//!                          handler 1 ──▶ handler 2 ──▶ ...  ◀──────────┘
//! ```
//!
//! - Each distinct message id reaches the handlers at most once per process
//! - Handlers for one message run in registration order; a failing or
//!   panicking handler is logged and does not stop the others
//! - Distinct messages are processed concurrently

use crate::envelope::{DispatchEnvelope, MessageId};
use crate::events::{DispatchEvent, EventName};
use crate::seen_cache::{SeenError, SeenMessageCache};
use crate::transport::Transport;
use crate::BusError;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use registry_telemetry::metrics::{
    DISPATCH_DUPLICATES, DISPATCH_HANDLER_FAILURES, DISPATCH_PUBLISHED, DISPATCH_RECEIVED,
    DISPATCH_REJECTED,
};
use shared_types::{current_timestamp, current_timestamp_ms};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Result type returned by handlers.
pub type HandlerResult = anyhow::Result<()>;

/// Receiver of one kind of dispatch event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, envelope: &DispatchEnvelope) -> HandlerResult;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(DispatchEnvelope) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, envelope: &DispatchEnvelope) -> HandlerResult {
        (self.0)(envelope.clone()).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(DispatchEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Publish-side options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Not retained by the network for later replay.
    pub ephemeral: bool,
    /// Attach an HMAC signature (requires a configured signing key).
    pub signed: bool,
}

impl PublishOptions {
    pub fn ephemeral() -> Self {
        Self {
            ephemeral: true,
            signed: false,
        }
    }

    #[must_use]
    pub fn with_signature(mut self) -> Self {
        self.signed = true;
        self
    }
}

/// Subscribe-side options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Only live traffic: envelopes older than the live window are skipped.
    pub ephemeral: bool,
    /// Only envelopes carrying a valid signature.
    pub require_signature: bool,
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum remembered message ids.
    pub seen_capacity: usize,
    /// Envelopes older than this are rejected and their ids forgotten.
    pub seen_ttl_secs: u64,
    /// Accepted sender clock skew into the future.
    pub max_future_skew_secs: u64,
    /// Seen-cache garbage collection interval.
    pub gc_interval_secs: u64,
    /// Age limit for ephemeral subscriptions.
    pub live_window_secs: u64,
    /// Shared HMAC key for signing and verifying envelopes.
    pub signing_key: Option<Vec<u8>>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            seen_capacity: SeenMessageCache::DEFAULT_CAPACITY,
            seen_ttl_secs: SeenMessageCache::DEFAULT_MAX_AGE,
            max_future_skew_secs: SeenMessageCache::DEFAULT_MAX_FUTURE_SKEW,
            gc_interval_secs: SeenMessageCache::DEFAULT_GC_INTERVAL,
            live_window_secs: 30,
            signing_key: None,
        }
    }
}

impl DispatcherConfig {
    pub fn with_signing_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.signing_key = Some(key.into());
        self
    }

    pub fn validate(&self) -> Result<(), BusError> {
        if self.seen_capacity == 0 {
            return Err(BusError::Config("seen_capacity must be > 0".into()));
        }
        if self.seen_ttl_secs == 0 {
            return Err(BusError::Config("seen_ttl_secs must be > 0".into()));
        }
        if self.signing_key.as_ref().is_some_and(|k| k.is_empty()) {
            return Err(BusError::Config("signing_key must not be empty".into()));
        }
        Ok(())
    }
}

/// Handle returned by [`Dispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    handler: Arc<dyn EventHandler>,
    options: SubscribeOptions,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to `invoked` handlers, `failed` of which errored or panicked.
    Delivered { invoked: usize, failed: usize },
    /// Already delivered.
    Duplicate,
    /// Addressed to another topic.
    ForeignTopic,
    /// Every handler requires a signature the envelope lacks.
    Unauthenticated,
}

/// Dispatcher counters.
#[derive(Debug, Default)]
pub struct DispatchStats {
    published: AtomicU64,
    received: AtomicU64,
    duplicates: AtomicU64,
    rejected: AtomicU64,
    handler_failures: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    pub published: u64,
    pub received: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub handler_failures: u64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

struct Inner {
    topic: String,
    transport: Arc<dyn Transport>,
    config: DispatcherConfig,
    handlers: RwLock<HashMap<EventName, Vec<Registration>>>,
    next_handler_id: AtomicU64,
    seen: Mutex<SeenMessageCache>,
    stats: DispatchStats,
    receive_loop: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.receive_loop.get_mut().take() {
            handle.abort();
        }
    }
}

/// Topic-scoped dispatcher. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(
        topic: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: DispatcherConfig,
    ) -> Result<Self, BusError> {
        config.validate()?;
        let seen = SeenMessageCache::with_config(
            config.seen_capacity,
            config.seen_ttl_secs,
            config.max_future_skew_secs,
            config.gc_interval_secs,
        );
        Ok(Self {
            inner: Arc::new(Inner {
                topic: topic.into(),
                transport,
                config,
                handlers: RwLock::new(HashMap::new()),
                next_handler_id: AtomicU64::new(1),
                seen: Mutex::new(seen),
                stats: DispatchStats::default(),
                receive_loop: tokio::sync::Mutex::new(None),
            }),
        })
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Register `handler` for `event`. Handlers added after `start` receive
    /// subsequent messages.
    pub fn subscribe(
        &self,
        event: EventName,
        handler: Arc<dyn EventHandler>,
        options: SubscribeOptions,
    ) -> HandlerId {
        let id = HandlerId(self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .handlers
            .write()
            .entry(event)
            .or_default()
            .push(Registration {
                id,
                handler,
                options,
            });
        debug!(topic = %self.inner.topic, %event, "Handler registered");
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.inner.handlers.write();
        let mut removed = false;
        for registrations in handlers.values_mut() {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            removed |= registrations.len() != before;
        }
        removed
    }

    /// Publish `event` on this dispatcher's topic.
    ///
    /// Returns once the transport accepted the message; delivery is not
    /// confirmed.
    pub async fn publish(
        &self,
        event: &DispatchEvent,
        options: PublishOptions,
    ) -> Result<MessageId, BusError> {
        let key = match (options.signed, self.inner.config.signing_key.as_deref()) {
            (true, Some(key)) => Some(key),
            (true, None) => return Err(BusError::SigningKeyMissing),
            (false, _) => None,
        };

        let name = event.name();
        let (message_id, bytes) =
            DispatchEnvelope::encode(&self.inner.topic, event, options.ephemeral, key)?;

        self.inner
            .transport
            .publish(&self.inner.topic, bytes, options.ephemeral)
            .await?;

        self.inner.stats.published.fetch_add(1, Ordering::Relaxed);
        DISPATCH_PUBLISHED
            .with_label_values(&[&self.inner.topic, name.as_str()])
            .inc();
        debug!(
            topic = %self.inner.topic,
            event = %name,
            message_id = %message_id,
            correlation_id = %event.correlation_id(),
            "Event published"
        );
        Ok(message_id)
    }

    /// Begin receiving. Idempotent while running.
    pub async fn start(&self) -> Result<(), BusError> {
        let mut receive_loop = self.inner.receive_loop.lock().await;
        if receive_loop.as_ref().is_some_and(|h| !h.is_finished()) {
            return Ok(());
        }

        let mut subscription = self.inner.transport.subscribe(&self.inner.topic).await?;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let topic = self.inner.topic.clone();

        *receive_loop = Some(tokio::spawn(async move {
            while let Some(bytes) = subscription.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    // Errors are already logged and counted
                    let _ = inner.deliver(&bytes).await;
                });
            }
            debug!(topic = %topic, "Receive loop ended");
        }));

        info!(
            topic = %self.inner.topic,
            transport = self.inner.transport.name(),
            "Dispatcher started"
        );
        Ok(())
    }

    /// Stop receiving. Publishing remains possible.
    pub async fn stop(&self) {
        if let Some(handle) = self.inner.receive_loop.lock().await.take() {
            handle.abort();
            info!(topic = %self.inner.topic, "Dispatcher stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .receive_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Run one raw message through the full inbound path and wait for its
    /// handlers.
    pub async fn dispatch_raw(&self, bytes: &[u8]) -> Result<DeliveryOutcome, BusError> {
        self.inner.deliver(bytes).await
    }
}

impl Inner {
    fn reject(&self, reason: &str) {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        DISPATCH_REJECTED
            .with_label_values(&[&self.topic, reason])
            .inc();
    }

    async fn deliver(&self, bytes: &[u8]) -> Result<DeliveryOutcome, BusError> {
        let mut envelope = match DispatchEnvelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "Dropping undecodable envelope");
                self.reject("malformed");
                return Err(e);
            }
        };

        if envelope.topic != self.topic {
            debug!(topic = %self.topic, other = %envelope.topic, "Ignoring envelope for another topic");
            return Ok(DeliveryOutcome::ForeignTopic);
        }

        if let Some(key) = self.config.signing_key.as_deref() {
            envelope.authenticated = envelope.verify_signature(key);
        }

        let name = envelope.event.name();
        let sent_at = envelope.sent_at();
        let now_ms = current_timestamp_ms();
        let age_ms = now_ms.saturating_sub(sent_at);
        let live_ms = self.config.live_window_secs.saturating_mul(1000);

        let eligible: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read();
            let registrations = handlers.get(&name).map(Vec::as_slice).unwrap_or_default();
            if !envelope.authenticated
                && !registrations.is_empty()
                && registrations.iter().all(|r| r.options.require_signature)
            {
                // Leave the id unrecorded so a signed copy still gets through
                warn!(topic = %self.topic, event = %name, "Dropping unauthenticated envelope");
                self.reject("unauthenticated");
                return Ok(DeliveryOutcome::Unauthenticated);
            }
            registrations
                .iter()
                .filter(|r| envelope.authenticated || !r.options.require_signature)
                .filter(|r| !r.options.ephemeral || age_ms <= live_ms)
                .map(|r| Arc::clone(&r.handler))
                .collect()
        };

        let seen = self
            .seen
            .lock()
            .validate_and_add(envelope.message_id, sent_at / 1000, current_timestamp());
        match seen {
            Ok(()) => {}
            Err(SeenError::Duplicate { id }) => {
                self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
                DISPATCH_DUPLICATES.with_label_values(&[&self.topic]).inc();
                debug!(topic = %self.topic, message_id = %id, "Duplicate envelope suppressed");
                return Ok(DeliveryOutcome::Duplicate);
            }
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "Dropping envelope outside the acceptance window");
                self.reject("stale");
                return Err(BusError::Stale(e));
            }
        }

        self.stats.received.fetch_add(1, Ordering::Relaxed);
        DISPATCH_RECEIVED
            .with_label_values(&[&self.topic, name.as_str()])
            .inc();

        let envelope = Arc::new(envelope);
        let mut invoked = 0;
        let mut failed = 0;
        for handler in eligible {
            invoked += 1;
            let env = Arc::clone(&envelope);
            let outcome = tokio::spawn(async move { handler.handle(&env).await }).await;
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{e:#}")),
                Err(join_error) => Some(format!("handler panicked: {join_error}")),
            };
            if let Some(reason) = failure {
                failed += 1;
                self.stats.handler_failures.fetch_add(1, Ordering::Relaxed);
                DISPATCH_HANDLER_FAILURES
                    .with_label_values(&[&self.topic, name.as_str()])
                    .inc();
                error!(
                    topic = %self.topic,
                    event = %name,
                    message_id = %envelope.message_id,
                    error = %reason,
                    "Handler failed"
                );
            }
        }

        Ok(DeliveryOutcome::Delivered { invoked, failed })
    }
}
