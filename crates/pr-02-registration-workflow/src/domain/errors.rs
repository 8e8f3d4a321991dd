//! # Workflow Errors

use crate::domain::config::ConfigError;
use crate::ports::outbound::ProverError;
use pr_01_onchain_gateway::GatewayError;
use shared_types::{ErrorKind, RegistryError};
use thiserror::Error;

/// Errors returned by workflow operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// The operation is not allowed in the current state
    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Relay path selected but no relay client is attached
    #[error("relay submission is not configured")]
    RelayNotConfigured,

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Submission resolved with a classified failure
    #[error("registration failed: {0}")]
    Submission(RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { .. } | Self::RelayNotConfigured | Self::Config(_) => {
                ErrorKind::Validation
            }
            Self::Prover(e) => e.kind(),
            Self::Gateway(e) => e.kind(),
            Self::Submission(e) => e.kind,
        }
    }
}

impl From<WorkflowError> for RegistryError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Submission(inner) => inner,
            other => RegistryError::new(other.kind(), other.to_string()),
        }
    }
}
