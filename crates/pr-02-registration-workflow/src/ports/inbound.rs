//! # Inbound Ports (API)

use crate::domain::errors::WorkflowError;
use crate::domain::state::{SubmissionPath, WorkflowSnapshot};
use async_trait::async_trait;
use shared_types::TxHash;

/// Operations the holder drives.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    /// Enter or edit the commitment. Checks run after the debounce period;
    /// an edit supersedes any check still in flight.
    fn set_commitment(&self, input: &str) -> Result<(), WorkflowError>;

    /// Open a proof request for a valid commitment. Returns the session URL;
    /// the proof phase then advances on prover events.
    async fn request_proof(&self) -> Result<String, WorkflowError>;

    /// Submit the generated proof along `path` and wait for the outcome.
    async fn confirm(&self, path: SubmissionPath) -> Result<TxHash, WorkflowError>;

    /// Drop the current attempt and return to `Idle`.
    fn reset(&self);

    fn snapshot(&self) -> WorkflowSnapshot;
}
