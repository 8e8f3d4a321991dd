//! # Relay Errors

use crate::domain::config::ConfigError;
use pr_01_onchain_gateway::GatewayError;
use shared_bus::BusError;
use shared_types::{ErrorKind, Identifier, RegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The request failed local checks
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Already registered, found by the defensive re-check
    #[error("identifier {0} is already registered")]
    DuplicateIdentifier(Identifier),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) | Self::Config(_) => ErrorKind::Validation,
            Self::DuplicateIdentifier(_) => ErrorKind::DuplicateIdentifier,
            Self::Gateway(e) => e.kind(),
            Self::Bus(e) => e.kind(),
        }
    }
}

impl From<RegistryError> for RelayError {
    fn from(err: RegistryError) -> Self {
        Self::InvalidRequest(err.message)
    }
}

impl From<RelayError> for RegistryError {
    fn from(err: RelayError) -> Self {
        RegistryError::new(err.kind(), err.to_string())
    }
}
