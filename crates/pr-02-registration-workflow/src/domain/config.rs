//! Workflow configuration with validation.

use crate::ports::outbound::ProofRequest;
use std::time::Duration;
use thiserror::Error;

/// Registration workflow configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Quiet period after a commitment edit before the ledger is queried
    pub debounce: Duration,
    /// Upper bound on waiting for a relay response
    pub relay_timeout: Duration,
    /// Application name shown by the prover
    pub app_name: String,
    pub purpose: String,
    /// Proof scope, also checked on-chain
    pub scope: String,
    /// Prover output mode
    pub mode: String,
    /// Accept mock proofs
    pub dev_mode: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            relay_timeout: Duration::from_secs(60),
            app_name: "ZKPassport".to_string(),
            purpose: "Prove your personhood".to_string(),
            scope: "personhood".to_string(),
            mode: "compressed-evm".to_string(),
            dev_mode: false,
        }
    }
}

impl WorkflowConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "relay_timeout cannot be 0".into(),
            ));
        }
        if self.scope.trim().is_empty() {
            return Err(ConfigError::Invalid("scope cannot be empty".into()));
        }
        Ok(())
    }

    /// The request sent to the prover for each attempt.
    pub fn proof_request(&self) -> ProofRequest {
        ProofRequest {
            name: self.app_name.clone(),
            purpose: self.purpose.clone(),
            scope: self.scope.clone(),
            mode: self.mode.clone(),
            dev_mode: self.dev_mode,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Generic validation error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
