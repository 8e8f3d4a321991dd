//! # Dispatch Events
//!
//! The closed set of events exchanged over the registration and mint topics.
//!
//! | Event | Topic | Sender |
//! |-------|-------|--------|
//! | `register` | registration | holder |
//! | `register_response` | registration | relay |
//! | `mint` | mint | any client |
//! | `mint_response` | mint | relay |
//!
//! Requests carry a [`CorrelationId`] that the matching response echoes.

use serde::{Deserialize, Serialize};
use shared_types::{
    current_timestamp_ms, Address, CorrelationId, ErrorKind, IdCommitment, Identifier,
    ProofVerificationParams, RegistryError, TxHash, U256,
};
use std::fmt;

/// Default content topics.
pub mod topics {
    /// Registration requests and responses.
    pub const REGISTRATION: &str = "/rln/1/register/json";
    /// Mint requests and responses.
    pub const MINT: &str = "/rln/1/mint/json";
}

/// Event names, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    Register,
    RegisterResponse,
    Mint,
    MintResponse,
}

impl EventName {
    pub const ALL: [EventName; 4] = [
        Self::Register,
        Self::RegisterResponse,
        Self::Mint,
        Self::MintResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::RegisterResponse => "register_response",
            Self::Mint => "mint",
            Self::MintResponse => "mint_response",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof material attached to a registration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub params: ProofVerificationParams,
}

/// Payload of `register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub correlation_id: CorrelationId,
    pub verification: Verification,
    pub id_commitment: IdCommitment,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl RegistrationRequest {
    pub fn new(params: ProofVerificationParams, id_commitment: IdCommitment) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            verification: Verification { params },
            id_commitment,
            timestamp: current_timestamp_ms(),
        }
    }
}

/// Payload of `mint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub correlation_id: CorrelationId,
    pub recipient: Address,
    /// Falls back to the relay's configured amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<U256>,
    /// Informational; the relay does not enforce it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_identifier: Option<Identifier>,
    pub timestamp: u64,
}

impl MintRequest {
    pub fn new(recipient: Address, amount: Option<U256>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            recipient,
            amount,
            unique_identifier: None,
            timestamp: current_timestamp_ms(),
        }
    }
}

/// Payload of `register_response` and `mint_response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub correlation_id: CorrelationId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Milliseconds since the Unix epoch. A response without one is
    /// treated as stale by the dispatcher.
    #[serde(default)]
    pub timestamp: u64,
}

impl RelayResponse {
    pub fn success(correlation_id: CorrelationId, hash: TxHash) -> Self {
        Self {
            correlation_id,
            success: true,
            hash: Some(hash),
            error: None,
            error_kind: None,
            timestamp: current_timestamp_ms(),
        }
    }

    pub fn failure(correlation_id: CorrelationId, error: &RegistryError) -> Self {
        Self {
            correlation_id,
            success: false,
            hash: None,
            error: Some(error.message.clone()),
            error_kind: Some(error.kind),
            timestamp: current_timestamp_ms(),
        }
    }

    /// Collapse into the submitted hash or a classified error.
    ///
    /// A failure without `errorKind` is treated as a ledger failure.
    pub fn into_result(self) -> Result<TxHash, RegistryError> {
        match (self.success, self.hash) {
            (true, Some(hash)) => Ok(hash),
            (true, None) => Err(RegistryError::transport("success response without a hash")),
            (false, _) => Err(RegistryError::new(
                self.error_kind.unwrap_or(ErrorKind::TransactionFailed),
                self.error.unwrap_or_else(|| "relay reported failure".to_string()),
            )),
        }
    }
}

/// A typed dispatch event.
///
/// Serializes adjacently tagged: `{"event": "<name>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum DispatchEvent {
    Register(RegistrationRequest),
    RegisterResponse(RelayResponse),
    Mint(MintRequest),
    MintResponse(RelayResponse),
}

impl DispatchEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::Register(_) => EventName::Register,
            Self::RegisterResponse(_) => EventName::RegisterResponse,
            Self::Mint(_) => EventName::Mint,
            Self::MintResponse(_) => EventName::MintResponse,
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::Register(r) => r.correlation_id,
            Self::Mint(m) => m.correlation_id,
            Self::RegisterResponse(r) | Self::MintResponse(r) => r.correlation_id,
        }
    }

    /// Sender clock from the payload, milliseconds since the Unix epoch.
    ///
    /// Part of the content the message id is derived from, so a relayed copy
    /// cannot refresh it without changing the id.
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Register(r) => r.timestamp,
            Self::Mint(m) => m.timestamp,
            Self::RegisterResponse(r) | Self::MintResponse(r) => r.timestamp,
        }
    }

    /// Split into the wire event name and the JSON payload.
    pub fn to_parts(&self) -> Result<(EventName, serde_json::Value), serde_json::Error> {
        let payload = match self {
            Self::Register(r) => serde_json::to_value(r)?,
            Self::Mint(m) => serde_json::to_value(m)?,
            Self::RegisterResponse(r) | Self::MintResponse(r) => serde_json::to_value(r)?,
        };
        Ok((self.name(), payload))
    }

    /// Rebuild from a known event name and its payload.
    pub fn from_parts(
        name: EventName,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match name {
            EventName::Register => Self::Register(serde_json::from_value(payload)?),
            EventName::RegisterResponse => Self::RegisterResponse(serde_json::from_value(payload)?),
            EventName::Mint => Self::Mint(serde_json::from_value(payload)?),
            EventName::MintResponse => Self::MintResponse(serde_json::from_value(payload)?),
        })
    }
}
