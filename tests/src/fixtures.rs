//! Shared fixtures: one in-memory ledger and one in-memory transport with a
//! relay attached, onto which any number of holders can be added.

use pr_01_onchain_gateway::{GatewayConfig, InMemoryLedger, OnChainGateway};
use pr_02_registration_workflow::{
    RegistrationApi, RegistrationWorkflow, RelayClient, ScriptedProver, WorkflowConfig,
    WorkflowSnapshot, WorkflowState,
};
use pr_03_relay_service::{RelayConfig, RelayListener, RelayService};
use shared_bus::{topics, Dispatcher, DispatcherConfig, InMemoryTransport};
use shared_types::{Address, ProofArtifact, ProofVerificationParams};
use std::sync::Arc;
use std::time::Duration;

pub type Gateway = OnChainGateway<InMemoryLedger>;
pub type Workflow = RegistrationWorkflow<Gateway, ScriptedProver>;

pub const RELAY_ADDRESS: Address = Address([0xEE; 20]);
pub const HOLDER_ADDRESS: Address = Address([0x11; 20]);

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Proof whose identifier is `[identifier; 32]`.
pub fn artifact(identifier: u8) -> ProofArtifact {
    ProofArtifact::new(
        vec![0xAB, identifier],
        ProofVerificationParams {
            vkey_hash: [0x42; 32],
            proof: vec![0xAB, identifier],
            public_inputs: vec![[identifier; 32], [0; 32]],
            committed_inputs: vec![1, 2, 3],
            committed_input_counts: vec![3],
            validity_period_in_seconds: 604_800,
            domain: "localhost".into(),
            scope: "personhood".into(),
            dev_mode: true,
        },
    )
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        poll_interval: Duration::from_millis(5),
        confirmation_timeout: Duration::from_secs(2),
        ..GatewayConfig::default()
    }
}

pub fn workflow_config() -> WorkflowConfig {
    WorkflowConfig {
        debounce: Duration::from_millis(10),
        relay_timeout: Duration::from_secs(3),
        ..WorkflowConfig::default()
    }
}

/// Gateway bound to `signer` on the shared ledger.
pub fn gateway(ledger: &InMemoryLedger, signer: Address) -> Arc<Gateway> {
    Arc::new(OnChainGateway::new(ledger.as_signer(signer), gateway_config()).expect("valid gateway config"))
}

/// A ledger, a transport and a running relay.
pub struct Network {
    pub ledger: InMemoryLedger,
    pub transport: Arc<InMemoryTransport>,
    pub relay_bus: Dispatcher,
    pub relay: Arc<RelayService<Gateway>>,
    _listener: RelayListener,
}

impl Network {
    pub async fn start() -> Self {
        let ledger = InMemoryLedger::new(RELAY_ADDRESS);
        let transport = Arc::new(InMemoryTransport::new());

        let relay = Arc::new(
            RelayService::new(gateway(&ledger, RELAY_ADDRESS), RelayConfig::default())
                .expect("valid relay config"),
        );
        let relay_bus = Self::dispatcher(&transport, topics::REGISTRATION);
        let mint_bus = Self::dispatcher(&transport, topics::MINT);
        let listener = RelayListener::attach(Arc::clone(&relay), relay_bus.clone(), mint_bus.clone());
        relay_bus.start().await.expect("relay subscribes");
        mint_bus.start().await.expect("relay subscribes");

        Self {
            ledger,
            transport,
            relay_bus,
            relay,
            _listener: listener,
        }
    }

    pub fn dispatcher(transport: &Arc<InMemoryTransport>, topic: &str) -> Dispatcher {
        Dispatcher::new(topic, transport.clone(), DispatcherConfig::default())
            .expect("valid dispatcher config")
    }

    /// A holder whose workflow can take either submission path.
    pub async fn holder(&self, prover: ScriptedProver) -> Workflow {
        let bus = Self::dispatcher(&self.transport, topics::REGISTRATION);
        bus.start().await.expect("holder subscribes");
        let config = workflow_config();
        let client = RelayClient::attach(bus, config.relay_timeout);

        RegistrationWorkflow::new_with_relay(
            gateway(&self.ledger, HOLDER_ADDRESS),
            prover,
            Arc::new(client),
            config,
        )
        .expect("valid workflow config")
    }
}

/// Wait until the commitment check has resolved.
pub async fn settle_commitment(wf: &Workflow) -> WorkflowSnapshot {
    tokio::time::timeout(WAIT, wf.wait_for(|s| *s != WorkflowState::CommitmentPending))
        .await
        .expect("commitment check resolves")
}

/// Enter `commitment`, generate the proof and stop at the confirmation
/// prompt.
pub async fn ready_to_confirm(wf: &Workflow, commitment: &str) {
    wf.set_commitment(commitment).expect("idle workflow accepts edits");
    assert_eq!(settle_commitment(wf).await.state, WorkflowState::CommitmentValid);
    wf.request_proof().await.expect("proof request opens");
    let snapshot = tokio::time::timeout(
        WAIT,
        wf.wait_for(|s| matches!(s, WorkflowState::AwaitingConfirmation | WorkflowState::Idle)),
    )
    .await
    .expect("proof phase resolves");
    assert_eq!(snapshot.state, WorkflowState::AwaitingConfirmation);
}
