//! Pending relay requests, keyed by correlation id.
//!
//! Flow:
//! 1. The client registers the request's correlation id and gets a receiver
//! 2. The request is published
//! 3. The response handler calls `complete()` with the relay's response
//! 4. The client awaits the receiver or times out and calls `expire()`

use dashmap::DashMap;
use shared_bus::{EventName, RelayResponse};
use shared_types::CorrelationId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

struct PendingRequest {
    sender: oneshot::Sender<RelayResponse>,
    created_at: Instant,
    /// Request event, for logging
    event: EventName,
}

/// Counters for the pending store
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    pub total_cancelled: AtomicU64,
    /// Responses nobody was waiting for
    pub total_unmatched: AtomicU64,
}

#[derive(Default)]
pub struct PendingResponses {
    pending: DashMap<CorrelationId, PendingRequest>,
    stats: PendingStats,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request about to be published.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        event: EventName,
    ) -> oneshot::Receiver<RelayResponse> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            correlation_id,
            PendingRequest {
                sender: tx,
                created_at: Instant::now(),
                event,
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        debug!(%correlation_id, %event, "Registered pending relay request");
        rx
    }

    /// Hand a response to its waiting request.
    ///
    /// Returns false for unknown, expired or already answered ids.
    pub fn complete(&self, response: RelayResponse) -> bool {
        let correlation_id = response.correlation_id;
        let Some((_, pending)) = self.pending.remove(&correlation_id) else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(%correlation_id, "Response for unknown or expired correlation ID");
            return false;
        };

        let elapsed = pending.created_at.elapsed();
        if pending.sender.send(response).is_err() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(%correlation_id, event = %pending.event, "Pending request receiver dropped");
            return false;
        }
        self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            %correlation_id,
            event = %pending.event,
            response_time_ms = elapsed.as_millis() as u64,
            "Completed pending relay request"
        );
        true
    }

    /// Forget a request whose wait ran out.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        if let Some((_, pending)) = self.pending.remove(correlation_id) {
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            warn!(
                %correlation_id,
                event = %pending.event,
                elapsed_ms = pending.created_at.elapsed().as_millis() as u64,
                "Relay request timed out"
            );
            true
        } else {
            false
        }
    }

    /// Forget a request that was never sent.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
