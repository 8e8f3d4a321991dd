//! # Error Types
//!
//! The failure taxonomy shared by every crate. Component errors carry their
//! own detail and map onto an [`ErrorKind`]; the registration workflow is the
//! single place that turns a kind into user-visible messaging.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure classes of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or already-taken commitment, or malformed proof parameters.
    Validation,
    /// The holder declined the proof request.
    ProofRejected,
    /// The prover failed.
    ProofError,
    /// The identifier is already bound on the ledger.
    DuplicateIdentifier,
    /// The ledger reverted or rejected the transaction.
    TransactionFailed,
    /// A confirmation or a relay response did not arrive in time.
    Timeout,
    /// Publish/subscribe failure or an undecodable envelope.
    Transport,
}

impl ErrorKind {
    /// Whether a fresh attempt with the same inputs may succeed.
    ///
    /// A duplicate identifier needs a new commitment and proof.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::DuplicateIdentifier)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ProofRejected => "proof_rejected",
            Self::ProofError => "proof_error",
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::TransactionFailed => "transaction_failed",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-crate error carrier.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RegistryError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RegistryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn duplicate_identifier(identifier: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::DuplicateIdentifier,
            format!("identifier {identifier} is already registered"),
        )
    }

    pub fn transaction_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransactionFailed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }
}

/// Errors parsing textual primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

impl From<ParseError> for RegistryError {
    fn from(err: ParseError) -> Self {
        Self::validation(err.to_string())
    }
}
