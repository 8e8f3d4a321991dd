//! # Registration Workflow Service
//!
//! One state machine per holder attempt, parameterized by the submission
//! path chosen at confirmation.
//!
//! ## Supersession
//!
//! Every commitment edit, proof request and reset bumps an epoch. Background
//! work (debounced commitment checks, prover event loops, in-flight
//! submissions) captures the epoch it started under and only writes state if
//! that epoch is still current. Ledger transactions are never cancelled;
//! a reset only detaches the client-visible state from them.

use crate::domain::config::WorkflowConfig;
use crate::domain::errors::WorkflowError;
use crate::domain::state::{status, SubmissionPath, WorkflowSnapshot, WorkflowState};
use crate::ports::inbound::RegistrationApi;
use crate::ports::outbound::{ProofSession, Prover, ProverEvent, RelaySubmitter};
use async_trait::async_trait;
use parking_lot::Mutex;
use pr_01_onchain_gateway::RegistryGateway;
use shared_types::{
    ErrorKind, IdCommitment, Identifier, ProofArtifact, RegistryError, TxHash,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Transitions kept for inspection.
const HISTORY_LIMIT: usize = 256;

struct Machine {
    state: WorkflowState,
    status: String,
    commitment: Option<IdCommitment>,
    proof: Option<ProofArtifact>,
    identifier: Option<Identifier>,
    proof_url: Option<String>,
    last_error: Option<RegistryError>,
    history: Vec<WorkflowState>,
    epoch: u64,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
            status: String::new(),
            commitment: None,
            proof: None,
            identifier: None,
            proof_url: None,
            last_error: None,
            history: vec![WorkflowState::Idle],
            epoch: 0,
        }
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            state: self.state.clone(),
            status: self.status.clone(),
            commitment: self.commitment,
            identifier: self.identifier,
            proof_url: self.proof_url.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn clear_attempt(&mut self) {
        self.commitment = None;
        self.proof = None;
        self.identifier = None;
        self.proof_url = None;
    }

    fn require(&self, operation: &'static str, ok: bool) -> Result<(), WorkflowError> {
        if ok {
            Ok(())
        } else {
            Err(WorkflowError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }
}

struct Inner<G, P> {
    gateway: Arc<G>,
    prover: P,
    relay: Option<Arc<dyn RelaySubmitter>>,
    config: WorkflowConfig,
    machine: Mutex<Machine>,
    snapshots: watch::Sender<WorkflowSnapshot>,
    commitment_task: Mutex<Option<JoinHandle<()>>>,
    proof_task: Mutex<Option<JoinHandle<()>>>,
}

/// Client-side registration workflow. Cheap to clone; clones share state.
pub struct RegistrationWorkflow<G, P> {
    inner: Arc<Inner<G, P>>,
}

impl<G, P> Clone for RegistrationWorkflow<G, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G, P> RegistrationWorkflow<G, P>
where
    G: RegistryGateway + 'static,
    P: Prover + 'static,
{
    /// Create a workflow using `gateway` for reads and self-submission.
    pub fn new(gateway: Arc<G>, prover: P, config: WorkflowConfig) -> Result<Self, WorkflowError> {
        Self::build(gateway, prover, None, config)
    }

    /// Create a workflow that can also submit through `relay`.
    pub fn new_with_relay(
        gateway: Arc<G>,
        prover: P,
        relay: Arc<dyn RelaySubmitter>,
        config: WorkflowConfig,
    ) -> Result<Self, WorkflowError> {
        Self::build(gateway, prover, Some(relay), config)
    }

    fn build(
        gateway: Arc<G>,
        prover: P,
        relay: Option<Arc<dyn RelaySubmitter>>,
        config: WorkflowConfig,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;
        let (snapshots, _) = watch::channel(WorkflowSnapshot::default());
        Ok(Self {
            inner: Arc::new(Inner {
                gateway,
                prover,
                relay,
                config,
                machine: Mutex::new(Machine::new()),
                snapshots,
                commitment_task: Mutex::new(None),
                proof_task: Mutex::new(None),
            }),
        })
    }

    /// Whether the relay path is available to [`confirm`](RegistrationApi::confirm).
    pub fn has_relay(&self) -> bool {
        self.inner.relay.is_some()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.inner.config
    }

    pub fn state(&self) -> WorkflowState {
        self.inner.machine.lock().state.clone()
    }

    /// Every state entered so far, oldest first (bounded).
    pub fn history(&self) -> Vec<WorkflowState> {
        self.inner.machine.lock().history.clone()
    }

    /// Receiver notified on every transition and status change.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Wait until the current state satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> WorkflowSnapshot
    where
        F: Fn(&WorkflowState) -> bool,
    {
        let mut rx = self.inner.snapshots.subscribe();
        let snapshot = match rx.wait_for(|snapshot| predicate(&snapshot.state)).await {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives as long as `self`
            Err(_) => self.inner.machine.lock().snapshot(),
        };
        snapshot
    }
}

impl<G, P> Inner<G, P>
where
    G: RegistryGateway + 'static,
    P: Prover + 'static,
{
    fn transition(&self, m: &mut Machine, state: WorkflowState, status: Option<&str>) {
        debug!(from = %m.state, to = %state, "Workflow transition");
        if let Some(status) = status {
            m.status = status.to_string();
        }
        m.state = state.clone();
        if m.history.len() >= HISTORY_LIMIT {
            m.history.remove(0);
        }
        m.history.push(state);
        self.snapshots.send_replace(m.snapshot());
    }

    /// Enter a terminal failure state, then clear the attempt and return to
    /// `Idle` keeping the status line and the error.
    fn fail(&self, m: &mut Machine, failed: WorkflowState, status: &str, error: RegistryError) {
        warn!(state = %failed, kind = %error.kind, error = %error.message, "Registration attempt failed");
        m.last_error = Some(error);
        self.transition(m, failed, Some(status));
        m.clear_attempt();
        self.transition(m, WorkflowState::Idle, None);
    }

    /// Run `f` on the machine if `epoch` is still current.
    fn if_current<F>(&self, epoch: u64, f: F) -> bool
    where
        F: FnOnce(&Self, &mut Machine),
    {
        let mut m = self.machine.lock();
        if m.epoch != epoch {
            debug!(epoch, current = m.epoch, "Dropping superseded update");
            return false;
        }
        f(self, &mut *m);
        true
    }

    fn set_status(&self, epoch: u64, status: &str) {
        self.if_current(epoch, |this, m| {
            m.status = status.to_string();
            this.snapshots.send_replace(m.snapshot());
        });
    }

    async fn check_commitment(&self, epoch: u64, input: String) {
        tokio::time::sleep(self.config.debounce).await;
        if self.machine.lock().epoch != epoch {
            return;
        }

        let commitment = match IdCommitment::parse(&input) {
            Ok(commitment) => commitment,
            Err(e) => {
                debug!(input = %input, error = %e, "Commitment does not parse");
                self.if_current(epoch, |this, m| {
                    this.transition(m, WorkflowState::CommitmentInvalid, Some(status::COMMITMENT_INVALID));
                });
                return;
            }
        };

        let (validity, membership) = tokio::join!(
            self.gateway.check_validity(&commitment),
            self.gateway.check_membership(&commitment)
        );

        let outcome = match (validity, membership) {
            (Ok(false), _) => Ok((WorkflowState::CommitmentInvalid, status::COMMITMENT_INVALID)),
            (Ok(true), Ok(true)) => Ok((WorkflowState::CommitmentTaken, status::COMMITMENT_TAKEN)),
            (Ok(true), Ok(false)) => Ok((WorkflowState::CommitmentValid, status::COMMITMENT_VALID)),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };

        self.if_current(epoch, |this, m| match outcome {
            Ok((state, status)) => {
                if state == WorkflowState::CommitmentValid {
                    m.commitment = Some(commitment);
                }
                this.transition(m, state, Some(status));
            }
            Err(e) => {
                warn!(%commitment, error = %e, "Commitment check failed");
                m.last_error = Some(e.into());
                this.transition(m, WorkflowState::Idle, Some(status::COMMITMENT_CHECK_FAILED));
            }
        });
    }

    async fn drive_proof(&self, epoch: u64, mut events: mpsc::Receiver<ProverEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                ProverEvent::BridgeConnected => self.set_status(epoch, status::BRIDGE_CONNECTED),
                ProverEvent::RequestReceived => self.set_status(epoch, status::REQUEST_RECEIVED),
                ProverEvent::GeneratingProof => {
                    self.if_current(epoch, |this, m| {
                        this.transition(m, WorkflowState::ProofGenerating, Some(status::PROOF_GENERATING));
                    });
                }
                ProverEvent::ProofGenerated(artifact) => {
                    self.on_proof_generated(epoch, artifact).await;
                    return;
                }
                ProverEvent::Rejected => {
                    self.if_current(epoch, |this, m| {
                        let error = RegistryError::new(ErrorKind::ProofRejected, "holder declined the proof request");
                        this.fail(m, WorkflowState::ProofRejected, status::PROOF_REJECTED, error);
                    });
                    return;
                }
                ProverEvent::Error(reason) => {
                    self.if_current(epoch, |this, m| {
                        let error = RegistryError::new(ErrorKind::ProofError, reason);
                        this.fail(m, WorkflowState::ProofError, status::PROOF_ERROR, error);
                    });
                    return;
                }
            }
            if self.machine.lock().epoch != epoch {
                return;
            }
        }

        self.if_current(epoch, |this, m| {
            let error = RegistryError::new(ErrorKind::ProofError, "prover session closed without a result");
            this.fail(m, WorkflowState::ProofError, status::PROOF_ERROR, error);
        });
    }

    async fn on_proof_generated(&self, epoch: u64, artifact: ProofArtifact) {
        let identifier = match artifact.identifier() {
            Ok(identifier) => identifier,
            Err(e) => {
                self.if_current(epoch, |this, m| {
                    let error = RegistryError::new(ErrorKind::ProofError, e.message);
                    this.fail(m, WorkflowState::ProofError, status::PROOF_ERROR, error);
                });
                return;
            }
        };

        let current = self.if_current(epoch, |this, m| {
            m.proof = Some(artifact);
            m.identifier = Some(identifier);
            this.transition(m, WorkflowState::ProofGenerated, Some(status::PROOF_GENERATED));
            this.transition(m, WorkflowState::UniquenessChecking, None);
        });
        if !current {
            return;
        }

        // Pre-flight only: the contract stays the authority on uniqueness
        let exists = self.gateway.check_identifier(&identifier).await;

        self.if_current(epoch, |this, m| match exists {
            Ok(false) => {
                info!(%identifier, "Proof ready for submission");
                this.transition(m, WorkflowState::AwaitingConfirmation, Some(status::VERIFICATION_SUCCESSFUL));
            }
            Ok(true) => {
                let error = RegistryError::duplicate_identifier(identifier);
                let failed = WorkflowState::SubmissionFailed {
                    kind: error.kind,
                    reason: error.message.clone(),
                };
                this.fail(m, failed, status::IDENTIFIER_TAKEN, error);
            }
            Err(e) => {
                let error: RegistryError = e.into();
                let failed = WorkflowState::SubmissionFailed {
                    kind: error.kind,
                    reason: error.message.clone(),
                };
                this.fail(m, failed, status::ONCHAIN_ERROR, error);
            }
        });
    }

    async fn submit(
        &self,
        epoch: u64,
        path: SubmissionPath,
        artifact: &ProofArtifact,
        commitment: &IdCommitment,
    ) -> Result<TxHash, RegistryError> {
        match path {
            SubmissionPath::SelfSubmit => self
                .gateway
                .register_and_confirm(&artifact.params, commitment)
                .await
                .map(|confirmed| confirmed.tx_hash)
                .map_err(Into::into),
            SubmissionPath::Relay => {
                let relay = self
                    .relay
                    .as_ref()
                    .ok_or_else(|| RegistryError::validation("relay submission is not configured"))?;
                let ticket = relay.publish_registration(&artifact.params, commitment).await?;
                debug!(correlation_id = %ticket.correlation_id, "Registration relayed");
                self.set_status(epoch, status::RELAY_PUBLISHED);
                ticket.wait().await
            }
        }
    }
}

#[async_trait]
impl<G, P> RegistrationApi for RegistrationWorkflow<G, P>
where
    G: RegistryGateway + 'static,
    P: Prover + 'static,
{
    fn set_commitment(&self, input: &str) -> Result<(), WorkflowError> {
        let epoch = {
            let mut m = self.inner.machine.lock();
            m.require("set_commitment", m.state.accepts_commitment())?;
            m.epoch += 1;
            m.clear_attempt();
            m.last_error = None;
            self.inner
                .transition(&mut *m, WorkflowState::CommitmentPending, Some(status::COMMITMENT_CHECKING));
            m.epoch
        };

        let inner = Arc::clone(&self.inner);
        let input = input.to_string();
        let handle = tokio::spawn(async move { inner.check_commitment(epoch, input).await });
        if let Some(previous) = self.inner.commitment_task.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn request_proof(&self) -> Result<String, WorkflowError> {
        let epoch = {
            let mut m = self.inner.machine.lock();
            m.require(
                "request_proof",
                m.state == WorkflowState::CommitmentValid && m.commitment.is_some(),
            )?;
            m.epoch += 1;
            m.last_error = None;
            self.inner
                .transition(&mut *m, WorkflowState::ProofRequested, Some(status::PROOF_INITIALIZING));
            m.epoch
        };

        let request = self.inner.config.proof_request();
        let ProofSession { url, events } = match self.inner.prover.request(request).await {
            Ok(session) => session,
            Err(e) => {
                self.inner.if_current(epoch, |this, m| {
                    this.fail(m, WorkflowState::ProofError, status::PROOF_ERROR, e.clone().into());
                });
                return Err(e.into());
            }
        };

        let current = self.inner.if_current(epoch, |this, m| {
            m.proof_url = Some(url.clone());
            this.snapshots.send_replace(m.snapshot());
        });
        if !current {
            return Err(WorkflowError::InvalidState {
                operation: "request_proof",
                state: self.state().name(),
            });
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.drive_proof(epoch, events).await });
        if let Some(previous) = self.inner.proof_task.lock().replace(handle) {
            previous.abort();
        }
        Ok(url)
    }

    async fn confirm(&self, path: SubmissionPath) -> Result<TxHash, WorkflowError> {
        if path == SubmissionPath::Relay && self.inner.relay.is_none() {
            return Err(WorkflowError::RelayNotConfigured);
        }

        let (epoch, artifact, commitment) = {
            let mut m = self.inner.machine.lock();
            m.require("confirm", m.state == WorkflowState::AwaitingConfirmation)?;
            let (Some(artifact), Some(commitment)) = (m.proof.clone(), m.commitment) else {
                return Err(WorkflowError::InvalidState {
                    operation: "confirm",
                    state: m.state.name(),
                });
            };
            self.inner
                .transition(&mut *m, WorkflowState::Submitting(path), Some(status::SUBMITTING));
            (m.epoch, artifact, commitment)
        };

        info!(%path, %commitment, "Submitting registration");
        let outcome = self.inner.submit(epoch, path, &artifact, &commitment).await;

        self.inner.if_current(epoch, |this, m| match &outcome {
            Ok(tx_hash) => {
                m.clear_attempt();
                let status = format!("Registered in transaction: {tx_hash}");
                this.transition(m, WorkflowState::Submitted { tx_hash: *tx_hash, path }, Some(&status));
            }
            Err(error) => {
                let failed = WorkflowState::SubmissionFailed {
                    kind: error.kind,
                    reason: error.message.clone(),
                };
                let status = format!("Registration failed: {}", error.message);
                this.fail(m, failed, &status, error.clone());
            }
        });

        outcome.map_err(WorkflowError::Submission)
    }

    fn reset(&self) {
        {
            let mut m = self.inner.machine.lock();
            m.epoch += 1;
            m.clear_attempt();
            m.last_error = None;
            m.status.clear();
            self.inner.transition(&mut *m, WorkflowState::Idle, None);
        }
        if let Some(task) = self.inner.commitment_task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.inner.proof_task.lock().take() {
            task.abort();
        }
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        self.inner.machine.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted_prover::ScriptedProver;
    use crate::ports::outbound::RelayTicket;
    use pr_01_onchain_gateway::{GatewayConfig, InMemoryLedger, OnChainGateway};
    use shared_types::{Address, CorrelationId, ProofVerificationParams};
    use std::time::Duration;

    type Gateway = OnChainGateway<InMemoryLedger>;

    fn artifact(identifier: u8) -> ProofArtifact {
        ProofArtifact::new(
            vec![0xAB],
            ProofVerificationParams {
                vkey_hash: [1u8; 32],
                proof: vec![0xAB],
                public_inputs: vec![[identifier; 32]],
                committed_inputs: vec![],
                committed_input_counts: vec![],
                validity_period_in_seconds: 604_800,
                domain: "localhost".into(),
                scope: "personhood".into(),
                dev_mode: true,
            },
        )
    }

    fn gateway(ledger: &InMemoryLedger) -> Arc<Gateway> {
        let config = GatewayConfig {
            poll_interval: Duration::from_millis(5),
            ..GatewayConfig::default()
        };
        Arc::new(OnChainGateway::new(ledger.clone(), config).unwrap())
    }

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            debounce: Duration::from_millis(20),
            relay_timeout: Duration::from_secs(2),
            ..WorkflowConfig::default()
        }
    }

    fn workflow(
        ledger: &InMemoryLedger,
        prover: ScriptedProver,
    ) -> RegistrationWorkflow<Gateway, ScriptedProver> {
        RegistrationWorkflow::new(gateway(ledger), prover, config()).unwrap()
    }

    async fn settle_commitment(wf: &RegistrationWorkflow<Gateway, ScriptedProver>) -> WorkflowSnapshot {
        tokio::time::timeout(
            Duration::from_secs(2),
            wf.wait_for(|s| *s != WorkflowState::CommitmentPending),
        )
        .await
        .unwrap()
    }

    async fn ready_to_confirm(wf: &RegistrationWorkflow<Gateway, ScriptedProver>, commitment: &str) {
        wf.set_commitment(commitment).unwrap();
        assert_eq!(settle_commitment(wf).await.state, WorkflowState::CommitmentValid);
        wf.request_proof().await.unwrap();
        let snapshot = tokio::time::timeout(
            Duration::from_secs(2),
            wf.wait_for(|s| matches!(s, WorkflowState::AwaitingConfirmation | WorkflowState::Idle)),
        )
        .await
        .unwrap();
        assert_eq!(snapshot.state, WorkflowState::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn test_valid_commitment() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));

        wf.set_commitment("123").unwrap();
        let snapshot = settle_commitment(&wf).await;
        assert_eq!(snapshot.state, WorkflowState::CommitmentValid);
        assert_eq!(snapshot.status, "ID Commitment is valid and available");
        assert_eq!(snapshot.commitment, Some(IdCommitment::from(123)));
    }

    #[tokio::test]
    async fn test_unparsable_commitment_is_invalid() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        ledger.set_unavailable(true);
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));

        // No ledger call is needed to reject it
        wf.set_commitment("not-a-number").unwrap();
        assert_eq!(settle_commitment(&wf).await.state, WorkflowState::CommitmentInvalid);
    }

    #[tokio::test]
    async fn test_zero_commitment_is_invalid() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));
        wf.set_commitment("0").unwrap();
        assert_eq!(settle_commitment(&wf).await.state, WorkflowState::CommitmentInvalid);
    }

    #[tokio::test]
    async fn test_member_commitment_is_taken() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let gw = gateway(&ledger);
        gw.register_and_confirm(&artifact(9).params, &IdCommitment::from(77))
            .await
            .unwrap();

        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));
        wf.set_commitment("77").unwrap();
        let snapshot = settle_commitment(&wf).await;
        assert_eq!(snapshot.state, WorkflowState::CommitmentTaken);
        assert_eq!(snapshot.status, status::COMMITMENT_TAKEN);
    }

    #[tokio::test]
    async fn test_latest_edit_wins() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));

        wf.set_commitment("0").unwrap();
        wf.set_commitment("12").unwrap();
        wf.set_commitment("123").unwrap();
        let snapshot = settle_commitment(&wf).await;
        assert_eq!(snapshot.state, WorkflowState::CommitmentValid);
        assert_eq!(snapshot.commitment, Some(IdCommitment::from(123)));

        // The superseded checks never resolved
        let resolved = wf
            .history()
            .iter()
            .filter(|s| matches!(s, WorkflowState::CommitmentValid | WorkflowState::CommitmentInvalid))
            .count();
        assert_eq!(resolved, 1);
    }

    #[tokio::test]
    async fn test_ledger_outage_during_check_returns_to_idle() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        ledger.set_unavailable(true);
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));

        wf.set_commitment("5").unwrap();
        let snapshot = settle_commitment(&wf).await;
        assert_eq!(snapshot.state, WorkflowState::Idle);
        assert_eq!(snapshot.status, status::COMMITMENT_CHECK_FAILED);
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn test_proof_requires_valid_commitment() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));
        let err = wf.request_proof().await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_self_path_submits() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(4)));
        ready_to_confirm(&wf, "123").await;

        let tx_hash = wf.confirm(SubmissionPath::SelfSubmit).await.unwrap();
        let snapshot = wf.snapshot();
        assert_eq!(
            snapshot.state,
            WorkflowState::Submitted {
                tx_hash,
                path: SubmissionPath::SelfSubmit
            }
        );
        assert!(snapshot.status.contains(&tx_hash.to_string()));
        assert!(ledger.is_registered(&Identifier([4; 32])));
    }

    #[tokio::test]
    async fn test_rejection_returns_to_idle() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::rejecting());

        wf.set_commitment("123").unwrap();
        settle_commitment(&wf).await;
        wf.request_proof().await.unwrap();

        let snapshot = tokio::time::timeout(
            Duration::from_secs(2),
            wf.wait_for(|s| *s == WorkflowState::Idle),
        )
        .await
        .unwrap();
        assert_eq!(snapshot.status, "User rejected the request");
        assert_eq!(snapshot.commitment, None);
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::ProofRejected);

        let history = wf.history();
        let generating = history
            .iter()
            .position(|s| *s == WorkflowState::ProofGenerating)
            .unwrap();
        assert_eq!(
            &history[generating..],
            &[
                WorkflowState::ProofGenerating,
                WorkflowState::ProofRejected,
                WorkflowState::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_prover_error_is_distinct() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::failing("bridge lost"));

        wf.set_commitment("123").unwrap();
        settle_commitment(&wf).await;
        wf.request_proof().await.unwrap();

        let snapshot = tokio::time::timeout(
            Duration::from_secs(2),
            wf.wait_for(|s| *s == WorkflowState::Idle),
        )
        .await
        .unwrap();
        assert_eq!(snapshot.status, "An error occurred. Please try again.");
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::ProofError);
        assert!(wf.history().contains(&WorkflowState::ProofError));
    }

    #[tokio::test]
    async fn test_preflight_duplicate_resets() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let gw = gateway(&ledger);
        gw.register_and_confirm(&artifact(6).params, &IdCommitment::from(600))
            .await
            .unwrap();

        let wf = workflow(&ledger, ScriptedProver::generating(artifact(6)));
        wf.set_commitment("123").unwrap();
        settle_commitment(&wf).await;
        wf.request_proof().await.unwrap();

        let snapshot = tokio::time::timeout(
            Duration::from_secs(2),
            wf.wait_for(|s| *s == WorkflowState::Idle),
        )
        .await
        .unwrap();
        assert_eq!(snapshot.status, status::IDENTIFIER_TAKEN);
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::DuplicateIdentifier);
        assert_eq!(snapshot.identifier, None);
        assert!(wf.history().iter().any(|s| matches!(
            s,
            WorkflowState::SubmissionFailed {
                kind: ErrorKind::DuplicateIdentifier,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_self_path_duplicate_from_contract() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(8)));
        ready_to_confirm(&wf, "123").await;

        // Someone else binds the identifier after the pre-flight check
        gateway(&ledger)
            .register_and_confirm(&artifact(8).params, &IdCommitment::from(800))
            .await
            .unwrap();

        let err = wf.confirm(SubmissionPath::SelfSubmit).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateIdentifier);
        assert_eq!(wf.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn test_relay_path_requires_relay() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(2)));
        ready_to_confirm(&wf, "123").await;

        let err = wf.confirm(SubmissionPath::Relay).await.unwrap_err();
        assert_eq!(err, WorkflowError::RelayNotConfigured);
        // The attempt is still confirmable on the self path
        assert_eq!(wf.state(), WorkflowState::AwaitingConfirmation);
    }

    /// Resolves every relayed registration with a fixed hash.
    struct InstantRelay(TxHash);

    #[async_trait]
    impl RelaySubmitter for InstantRelay {
        async fn publish_registration(
            &self,
            _params: &ProofVerificationParams,
            _commitment: &IdCommitment,
        ) -> Result<RelayTicket, RegistryError> {
            let hash = self.0;
            Ok(RelayTicket {
                correlation_id: CorrelationId::new(),
                response: Box::pin(async move { Ok::<_, RegistryError>(hash) }),
            })
        }
    }

    #[tokio::test]
    async fn test_relay_survives_cloning() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let original = RegistrationWorkflow::new_with_relay(
            gateway(&ledger),
            ScriptedProver::generating(artifact(3)),
            Arc::new(InstantRelay(TxHash([0xCD; 32]))),
            config(),
        )
        .unwrap();
        let wf = original.clone();
        assert!(wf.has_relay());
        assert!(!workflow(&ledger, ScriptedProver::rejecting()).has_relay());

        ready_to_confirm(&wf, "123").await;
        let tx_hash = wf.confirm(SubmissionPath::Relay).await.unwrap();
        assert_eq!(tx_hash, TxHash([0xCD; 32]));
        assert_eq!(
            original.state(),
            WorkflowState::Submitted {
                tx_hash,
                path: SubmissionPath::Relay
            }
        );
    }

    #[tokio::test]
    async fn test_reset_detaches_pending_check() {
        let ledger = InMemoryLedger::new(Address([1; 20]));
        let wf = workflow(&ledger, ScriptedProver::generating(artifact(1)));
        wf.set_commitment("123").unwrap();
        wf.reset();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(wf.state(), WorkflowState::Idle);
        assert_eq!(wf.snapshot().commitment, None);
    }
}
