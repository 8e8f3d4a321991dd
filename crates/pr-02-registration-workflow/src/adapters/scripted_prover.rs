//! Scripted prover for tests and local development.
//!
//! Each request replays a script of [`ProverEvent`]s, one step at a time.

use crate::ports::outbound::{ProofRequest, ProofSession, Prover, ProverError, ProverEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::ProofArtifact;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct ScriptedProver {
    default_script: Vec<ProverEvent>,
    queued: Mutex<VecDeque<Vec<ProverEvent>>>,
    step_delay: Duration,
    unavailable: Option<String>,
    requests: Mutex<Vec<ProofRequest>>,
}

impl ScriptedProver {
    /// Replays `script` for every request.
    pub fn new(script: Vec<ProverEvent>) -> Self {
        Self {
            default_script: script,
            queued: Mutex::new(VecDeque::new()),
            step_delay: Duration::from_millis(1),
            unavailable: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The full happy path ending in `artifact`.
    pub fn generating(artifact: ProofArtifact) -> Self {
        Self::new(vec![
            ProverEvent::BridgeConnected,
            ProverEvent::RequestReceived,
            ProverEvent::GeneratingProof,
            ProverEvent::ProofGenerated(artifact),
        ])
    }

    /// The holder declines while the proof is being generated.
    pub fn rejecting() -> Self {
        Self::new(vec![
            ProverEvent::BridgeConnected,
            ProverEvent::RequestReceived,
            ProverEvent::GeneratingProof,
            ProverEvent::Rejected,
        ])
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::new(vec![
            ProverEvent::BridgeConnected,
            ProverEvent::GeneratingProof,
            ProverEvent::Error(reason.into()),
        ])
    }

    /// Every request fails before a session opens.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let mut prover = Self::new(Vec::new());
        prover.unavailable = Some(reason.into());
        prover
    }

    #[must_use]
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Use `script` for the next request only.
    pub fn push_script(&self, script: Vec<ProverEvent>) {
        self.queued.lock().push_back(script);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ProofRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Prover for ScriptedProver {
    async fn request(&self, request: ProofRequest) -> Result<ProofSession, ProverError> {
        if let Some(reason) = &self.unavailable {
            return Err(ProverError::Unavailable(reason.clone()));
        }

        let script = self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_script.clone());
        let url = format!(
            "https://prover.local/request?scope={}&n={}",
            request.scope,
            self.requests.lock().len() + 1
        );
        self.requests.lock().push(request);

        let (tx, rx) = mpsc::channel(script.len().max(1));
        let delay = self.step_delay;
        tokio::spawn(async move {
            for event in script {
                tokio::time::sleep(delay).await;
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(ProofSession { url, events: rx })
    }
}
