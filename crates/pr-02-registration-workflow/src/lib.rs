//! # Registration Workflow (PR-02)
//!
//! Client-side state machine that takes a holder from a commitment to a
//! registered identifier.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): states, status lines, errors, configuration
//! - **Ports Layer** (`ports/`): `RegistrationApi` (inbound), `Prover` and
//!   `RelaySubmitter` (outbound)
//! - **Service Layer** (`service.rs`): `RegistrationWorkflow`
//! - **Adapters** (`adapters/`): `RelayClient` over the dispatcher,
//!   `ScriptedProver`
//!
//! ## Attempt Lifecycle
//!
//! 1. `set_commitment` checks validity and membership concurrently after a
//!    debounce; the latest edit wins.
//! 2. `request_proof` opens a prover session; prover events drive the
//!    proof states.
//! 3. A generated proof yields an identifier that is checked for prior
//!    registration before submission is offered.
//! 4. `confirm(path)` submits directly through the gateway or through a
//!    relay, and waits for the outcome.
//!
//! Failures after the commitment phase return the workflow to `Idle`; the
//! status line and `last_error` describe what happened.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::pending::{PendingResponses, PendingStats};
pub use adapters::relay_client::RelayClient;
pub use adapters::scripted_prover::ScriptedProver;
pub use domain::config::{ConfigError, WorkflowConfig};
pub use domain::errors::WorkflowError;
pub use domain::state::{status, SubmissionPath, WorkflowSnapshot, WorkflowState};
pub use ports::inbound::RegistrationApi;
pub use ports::outbound::{
    ProofRequest, ProofSession, Prover, ProverError, ProverEvent, RelaySubmitter, RelayTicket,
};
pub use service::RegistrationWorkflow;
