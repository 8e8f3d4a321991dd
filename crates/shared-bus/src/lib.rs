//! # Shared Bus - Topic-Scoped Message Dispatch
//!
//! Typed publish/subscribe over a best-effort network, used by holders and
//! the relay to exchange registration and mint requests.
//!
//! ## Layers
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Holder     │                    │    Relay     │
//! │  Dispatcher  │    publish()       │  Dispatcher  │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Transport   │          │
//!                  │ (in-memory / │ ─────────┘
//!                  │  Waku REST)  │  subscribe()
//!                  └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Content-id dedup:** an envelope's id is the keccak hash of its topic,
//!   event name and payload; each id reaches handlers at most once
//! - **Topic isolation:** a dispatcher only sees its own content topic
//! - **Optional authentication:** HMAC-signed envelopes for handlers that
//!   require them

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dispatcher;
pub mod envelope;
pub mod events;
pub mod memory;
pub mod seen_cache;
pub mod subscriber;
pub mod transport;
#[cfg(feature = "waku-rest")]
pub mod waku;

pub use dispatcher::{
    handler_fn, DeliveryOutcome, DispatchStatsSnapshot, Dispatcher, DispatcherConfig,
    EventHandler, HandlerId, HandlerResult, PublishOptions, SubscribeOptions,
};
pub use envelope::{DispatchEnvelope, MessageId, PROTOCOL_VERSION};
pub use events::{
    topics, DispatchEvent, EventName, MintRequest, RegistrationRequest, RelayResponse,
    Verification,
};
pub use memory::InMemoryTransport;
pub use seen_cache::{SeenError, SeenMessageCache};
pub use subscriber::Subscription;
pub use transport::{Transport, TransportError};
#[cfg(feature = "waku-rest")]
pub use waku::WakuRestTransport;

use shared_types::{ErrorKind, RegistryError};
use thiserror::Error;

/// Maximum messages to buffer per subscription before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Dispatcher errors.
#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Malformed envelope: {0}")]
    Malformed(String),

    #[error("Unsupported envelope version {0}")]
    UnsupportedVersion(u16),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Message id does not match envelope content")]
    MessageIdMismatch,

    #[error("Stale envelope: {0}")]
    Stale(SeenError),

    #[error("Signed publish requested but no signing key is configured")]
    SigningKeyMissing,

    #[error("Invalid dispatcher configuration: {0}")]
    Config(String),
}

impl BusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::SigningKeyMissing => ErrorKind::Validation,
            _ => ErrorKind::Transport,
        }
    }
}

impl From<BusError> for RegistryError {
    fn from(err: BusError) -> Self {
        RegistryError::new(err.kind(), err.to_string())
    }
}
