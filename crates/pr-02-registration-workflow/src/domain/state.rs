//! # Workflow States
//!
//! ```text
//! Idle ──▶ CommitmentPending ──▶ CommitmentValid | CommitmentInvalid | CommitmentTaken
//!
//! CommitmentValid ──▶ ProofRequested ──▶ ProofGenerating ──▶ ProofGenerated
//!                                                        ├─▶ ProofRejected ─▶ Idle
//!                                                        └─▶ ProofError ────▶ Idle
//!
//! ProofGenerated ──▶ UniquenessChecking ──▶ AwaitingConfirmation
//!                              │                    │
//!                              ▼                    ▼
//!                  SubmissionFailed ─▶ Idle   Submitting(path) ──▶ Submitted
//!                                                              └─▶ SubmissionFailed ─▶ Idle
//! ```

use shared_types::{ErrorKind, IdCommitment, Identifier, RegistryError, TxHash};
use std::fmt;

/// How a confirmed attempt reaches the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionPath {
    /// The holder's own signer calls the gateway.
    SelfSubmit,
    /// A relay submits on the holder's behalf over the dispatcher.
    Relay,
}

impl SubmissionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfSubmit => "self",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for SubmissionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    CommitmentPending,
    CommitmentValid,
    CommitmentInvalid,
    CommitmentTaken,
    ProofRequested,
    ProofGenerating,
    ProofGenerated,
    ProofRejected,
    ProofError,
    UniquenessChecking,
    AwaitingConfirmation,
    Submitting(SubmissionPath),
    Submitted {
        tx_hash: TxHash,
        path: SubmissionPath,
    },
    SubmissionFailed {
        kind: ErrorKind,
        reason: String,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CommitmentPending => "commitment_pending",
            Self::CommitmentValid => "commitment_valid",
            Self::CommitmentInvalid => "commitment_invalid",
            Self::CommitmentTaken => "commitment_taken",
            Self::ProofRequested => "proof_requested",
            Self::ProofGenerating => "proof_generating",
            Self::ProofGenerated => "proof_generated",
            Self::ProofRejected => "proof_rejected",
            Self::ProofError => "proof_error",
            Self::UniquenessChecking => "uniqueness_checking",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Submitting(_) => "submitting",
            Self::Submitted { .. } => "submitted",
            Self::SubmissionFailed { .. } => "submission_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CommitmentInvalid
                | Self::CommitmentTaken
                | Self::ProofRejected
                | Self::ProofError
                | Self::Submitted { .. }
                | Self::SubmissionFailed { .. }
        )
    }

    /// States in which the holder may (re)enter a commitment.
    pub fn accepts_commitment(&self) -> bool {
        matches!(
            self,
            Self::Idle
                | Self::CommitmentPending
                | Self::CommitmentValid
                | Self::CommitmentInvalid
                | Self::CommitmentTaken
                | Self::Submitted { .. }
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitting(path) => write!(f, "submitting[{path}]"),
            other => f.write_str(other.name()),
        }
    }
}

/// User-facing status lines.
pub mod status {
    pub const COMMITMENT_CHECKING: &str = "Checking ID Commitment...";
    pub const COMMITMENT_VALID: &str = "ID Commitment is valid and available";
    pub const COMMITMENT_INVALID: &str = "Invalid ID Commitment";
    pub const COMMITMENT_TAKEN: &str = "ID Commitment is already registered";
    pub const COMMITMENT_CHECK_FAILED: &str = "Could not check ID Commitment. Please try again.";
    pub const PROOF_INITIALIZING: &str = "Initializing proof generation...";
    pub const BRIDGE_CONNECTED: &str =
        "Bridge connected. Please complete the verification on your device.";
    pub const REQUEST_RECEIVED: &str =
        "Request received. Please complete the verification on your device.";
    pub const PROOF_GENERATING: &str = "Generating proof...";
    pub const PROOF_GENERATED: &str = "Proof generated successfully!";
    pub const PROOF_REJECTED: &str = "User rejected the request";
    pub const PROOF_ERROR: &str = "An error occurred. Please try again.";
    pub const VERIFICATION_SUCCESSFUL: &str = "Verification successful!";
    pub const IDENTIFIER_TAKEN: &str = "This identity is already registered";
    pub const SUBMITTING: &str = "Submitting registration...";
    pub const RELAY_PUBLISHED: &str = "Message published to Waku successfully!";
    pub const ONCHAIN_ERROR: &str = "Error during on-chain verification";
}

/// Point-in-time view of the workflow, broadcast on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub state: WorkflowState,
    pub status: String,
    pub commitment: Option<IdCommitment>,
    pub identifier: Option<Identifier>,
    /// Link the holder opens on their device to answer the proof request.
    pub proof_url: Option<String>,
    /// Cause of the most recent failure, kept across the reset to `Idle`.
    pub last_error: Option<RegistryError>,
}

impl Default for WorkflowSnapshot {
    fn default() -> Self {
        Self {
            state: WorkflowState::Idle,
            status: String::new(),
            commitment: None,
            identifier: None,
            proof_url: None,
            last_error: None,
        }
    }
}
