//! # Gateway Errors

use crate::domain::config::ConfigError;
use crate::ports::outbound::LedgerError;
use shared_types::{ErrorKind, Identifier, RegistryError, TxHash};
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the on-chain gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Proof parameters fail structural checks
    #[error("Invalid proof parameters: {0}")]
    InvalidParams(String),

    /// The identifier is already bound on the ledger
    #[error("Identifier {0} is already registered")]
    DuplicateIdentifier(Identifier),

    /// The transaction was mined but reverted
    #[error("Transaction {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: TxHash, reason: String },

    /// The ledger refused the transaction before mining
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// The ledger could not be reached or answered nonsense
    #[error("Ledger backend error: {0}")]
    Backend(String),

    /// No receipt arrived in time
    #[error("Transaction {tx_hash} not confirmed within {waited:?}")]
    Timeout { tx_hash: TxHash, waited: Duration },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParams(_) | Self::Config(_) => ErrorKind::Validation,
            Self::DuplicateIdentifier(_) => ErrorKind::DuplicateIdentifier,
            Self::Reverted { .. } | Self::Rejected(_) | Self::Backend(_) => {
                ErrorKind::TransactionFailed
            }
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

impl From<LedgerError> for GatewayError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(reason) => Self::Rejected(reason),
            LedgerError::Unavailable(reason) | LedgerError::Decode(reason) => Self::Backend(reason),
        }
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        Self::InvalidParams(err.message)
    }
}

impl From<GatewayError> for RegistryError {
    fn from(err: GatewayError) -> Self {
        RegistryError::new(err.kind(), err.to_string())
    }
}
