//! # Dispatch Envelope
//!
//! Wire framing for dispatch events.
//!
//! ```text
//! {
//!   "version": 1,
//!   "topic": "/rln/1/register/json",
//!   "event": "register",
//!   "payload": { ... },
//!   "ephemeral": false,
//!   "timestamp": 1700000000000,
//!   "messageId": "0x...",          keccak(topic ‖ 0 ‖ event ‖ 0 ‖ payload)
//!   "signature": "0x..."           optional HMAC-SHA256 over the message id
//! }
//! ```
//!
//! The message id depends only on content, so re-publishing the same event
//! (or a transport delivering it twice) yields the same id. The outer
//! `timestamp` is outside the id; every payload carries its own timestamp,
//! which is inside it.

use crate::events::{DispatchEvent, EventName};
use crate::BusError;
use serde::{Deserialize, Serialize};
use shared_types::{current_timestamp_ms, keccak256, serde_hex, sign_message, verify_message, Hash};
use std::fmt;

/// Current envelope format version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Content-derived identifier of a dispatched message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(#[serde(with = "shared_types::serde_hex::fixed32")] pub Hash);

impl MessageId {
    /// Derive the id from the topic, the event name and the canonical payload.
    pub fn compute(topic: &str, event: EventName, payload: &serde_json::Value) -> Self {
        let canonical = payload.to_string();
        Self(keccak256([
            topic.as_bytes(),
            &[0u8][..],
            event.as_str().as_bytes(),
            &[0u8][..],
            canonical.as_bytes(),
        ]))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serde_hex::encode(self.0))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({self})")
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    version: u16,
    topic: String,
    event: String,
    payload: serde_json::Value,
    #[serde(default)]
    ephemeral: bool,
    timestamp: u64,
    message_id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
}

/// A decoded envelope.
#[derive(Debug, Clone)]
pub struct DispatchEnvelope {
    pub topic: String,
    pub event: DispatchEvent,
    pub ephemeral: bool,
    /// Framing clock, milliseconds since the Unix epoch. Not covered by the
    /// message id or the signature; use [`sent_at`](Self::sent_at) for any
    /// freshness decision.
    pub timestamp: u64,
    pub message_id: MessageId,
    /// Raw signature bytes, if the sender signed.
    pub signature: Option<Vec<u8>>,
    /// Set by the dispatcher once the signature checks out.
    pub authenticated: bool,
}

impl DispatchEnvelope {
    /// Frame `event` for `topic`, signing the message id when a key is given.
    pub fn encode(
        topic: &str,
        event: &DispatchEvent,
        ephemeral: bool,
        signing_key: Option<&[u8]>,
    ) -> Result<(MessageId, Vec<u8>), BusError> {
        let (name, payload) = event
            .to_parts()
            .map_err(|e| BusError::Malformed(e.to_string()))?;
        let message_id = MessageId::compute(topic, name, &payload);

        let signature = match signing_key {
            Some(key) => Some(
                sign_message(&message_id.0, key)
                    .map(serde_hex::encode)
                    .ok_or(BusError::SigningKeyMissing)?,
            ),
            None => None,
        };

        let wire = WireEnvelope {
            version: PROTOCOL_VERSION,
            topic: topic.to_string(),
            event: name.as_str().to_string(),
            payload,
            ephemeral,
            timestamp: current_timestamp_ms(),
            message_id,
            signature,
        };
        let bytes = serde_json::to_vec(&wire).map_err(|e| BusError::Malformed(e.to_string()))?;
        Ok((message_id, bytes))
    }

    /// Parse and integrity-check raw bytes received from a transport.
    ///
    /// Unknown event names, malformed payloads and id mismatches are all
    /// rejected; nothing here is trusted until the id matches the content.
    pub fn decode(bytes: &[u8]) -> Result<Self, BusError> {
        let wire: WireEnvelope =
            serde_json::from_slice(bytes).map_err(|e| BusError::Malformed(e.to_string()))?;

        if wire.version != PROTOCOL_VERSION {
            return Err(BusError::UnsupportedVersion(wire.version));
        }

        let name =
            EventName::parse(&wire.event).ok_or_else(|| BusError::UnknownEvent(wire.event.clone()))?;

        if MessageId::compute(&wire.topic, name, &wire.payload) != wire.message_id {
            return Err(BusError::MessageIdMismatch);
        }

        let signature = wire
            .signature
            .as_deref()
            .map(serde_hex::decode)
            .transpose()
            .map_err(|e| BusError::Malformed(format!("signature: {e}")))?;

        let event = DispatchEvent::from_parts(name, wire.payload)
            .map_err(|e| BusError::Malformed(format!("{name} payload: {e}")))?;

        Ok(Self {
            topic: wire.topic,
            event,
            ephemeral: wire.ephemeral,
            timestamp: wire.timestamp,
            message_id: wire.message_id,
            signature,
            authenticated: false,
        })
    }

    /// The payload's sender clock, which the message id (and therefore the
    /// signature) covers.
    pub fn sent_at(&self) -> u64 {
        self.event.timestamp()
    }

    /// Check the HMAC tag against `key`.
    pub fn verify_signature(&self, key: &[u8]) -> bool {
        self.signature
            .as_deref()
            .is_some_and(|tag| verify_message(&self.message_id.0, tag, key))
    }
}
