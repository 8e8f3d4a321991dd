//! # Transport Port
//!
//! The byte-level pub/sub network beneath the dispatcher. Transports are
//! best-effort: they may drop, reorder or redeliver messages.

use crate::subscriber::Subscription;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The network could not be reached.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// The network refused the message.
    #[error("Publish rejected: {0}")]
    Rejected(String),

    /// The subscription stream ended.
    #[error("Subscription closed")]
    Closed,
}

/// Trait for a topic-addressed pub/sub network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish raw bytes to `topic`.
    ///
    /// `ephemeral` asks the network not to retain the message for later
    /// replay; transports without retention ignore it.
    async fn publish(&self, topic: &str, payload: Vec<u8>, ephemeral: bool)
        -> Result<(), TransportError>;

    /// Subscribe to raw messages on `topic`.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
