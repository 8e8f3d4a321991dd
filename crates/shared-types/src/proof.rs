//! Proof artifacts produced by the external prover and the parameters the
//! registry contract verifies.

use crate::entities::{Hash, Identifier};
use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};

/// On-chain verification parameters (`ProofVerificationParams` tuple).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofVerificationParams {
    /// Hash binding the verification key.
    #[serde(with = "crate::serde_hex::fixed32")]
    pub vkey_hash: Hash,
    #[serde(with = "crate::serde_hex::bytes")]
    pub proof: Vec<u8>,
    /// Ordered public input words. The first one is the identifier.
    #[serde(with = "crate::serde_hex::fixed32_vec")]
    pub public_inputs: Vec<Hash>,
    #[serde(with = "crate::serde_hex::bytes")]
    pub committed_inputs: Vec<u8>,
    /// Byte length of each segment of `committed_inputs`.
    pub committed_input_counts: Vec<u64>,
    pub validity_period_in_seconds: u64,
    pub domain: String,
    pub scope: String,
    pub dev_mode: bool,
}

impl ProofVerificationParams {
    /// Structural checks the contract would otherwise revert on.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.public_inputs.is_empty() {
            return Err(RegistryError::validation("proof has no public inputs"));
        }
        let declared: u64 = self.committed_input_counts.iter().sum();
        if declared != self.committed_inputs.len() as u64 {
            return Err(RegistryError::validation(format!(
                "committed input counts sum to {declared} but {} bytes were committed",
                self.committed_inputs.len()
            )));
        }
        Ok(())
    }

    /// The identifier the contract indexes for these parameters.
    pub fn identifier(&self) -> Result<Identifier, RegistryError> {
        self.public_inputs
            .first()
            .copied()
            .map(Identifier)
            .ok_or_else(|| RegistryError::validation("proof has no public inputs"))
    }
}

/// Output of the external prover for one registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofArtifact {
    /// Opaque proof bytes as returned by the prover.
    #[serde(with = "crate::serde_hex::bytes")]
    pub raw: Vec<u8>,
    pub params: ProofVerificationParams,
}

impl ProofArtifact {
    pub fn new(raw: Vec<u8>, params: ProofVerificationParams) -> Self {
        Self { raw, params }
    }

    pub fn identifier(&self) -> Result<Identifier, RegistryError> {
        self.params.identifier()
    }
}
