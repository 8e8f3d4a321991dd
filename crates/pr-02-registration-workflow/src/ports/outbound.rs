//! # Outbound Ports (SPI)
//!
//! - [`Prover`]: the external proof service. A request opens a session whose
//!   events arrive in the order the prover emits them.
//! - [`RelaySubmitter`]: hands a registration to a relay and resolves once
//!   the correlated response arrives.

use async_trait::async_trait;
use futures::future::BoxFuture;
use shared_types::{
    CorrelationId, ErrorKind, IdCommitment, ProofArtifact, ProofVerificationParams,
    RegistryError, TxHash,
};
use thiserror::Error;
use tokio::sync::mpsc;

/// What the holder is asked to prove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    pub name: String,
    pub purpose: String,
    pub scope: String,
    pub mode: String,
    pub dev_mode: bool,
}

/// Prover callbacks, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProverEvent {
    BridgeConnected,
    RequestReceived,
    GeneratingProof,
    ProofGenerated(ProofArtifact),
    Rejected,
    Error(String),
}

/// An open proof request.
#[derive(Debug)]
pub struct ProofSession {
    /// Link for the holder's device.
    pub url: String,
    pub events: mpsc::Receiver<ProverEvent>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProverError {
    #[error("prover unavailable: {0}")]
    Unavailable(String),

    #[error("proof request rejected")]
    Rejected,

    #[error("proof generation failed: {0}")]
    Failed(String),
}

impl ProverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected => ErrorKind::ProofRejected,
            Self::Unavailable(_) | Self::Failed(_) => ErrorKind::ProofError,
        }
    }
}

impl From<ProverError> for RegistryError {
    fn from(err: ProverError) -> Self {
        RegistryError::new(err.kind(), err.to_string())
    }
}

#[async_trait]
pub trait Prover: Send + Sync {
    async fn request(&self, request: ProofRequest) -> Result<ProofSession, ProverError>;
}

/// A relayed request that has been published and awaits its response.
pub struct RelayTicket {
    pub correlation_id: CorrelationId,
    pub response: BoxFuture<'static, Result<TxHash, RegistryError>>,
}

impl RelayTicket {
    pub async fn wait(self) -> Result<TxHash, RegistryError> {
        self.response.await
    }
}

#[async_trait]
pub trait RelaySubmitter: Send + Sync {
    /// Publish a registration request. Fails only if publishing fails.
    async fn publish_registration(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
    ) -> Result<RelayTicket, RegistryError>;
}
