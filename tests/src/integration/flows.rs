//! # Registration Flows
//!
//! Whole attempts from commitment entry to a terminal outcome, on both
//! submission paths, with the relay running over the in-memory transport.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pr_01_onchain_gateway::RegistryGateway;
    use pr_02_registration_workflow::{
        status, ProverEvent, RegistrationApi, ScriptedProver, SubmissionPath, WorkflowError,
        WorkflowState,
    };
    use shared_types::{ErrorKind, IdCommitment, Identifier};

    #[tokio::test]
    async fn test_relay_round_trip() {
        let network = Network::start().await;
        let wf = network.holder(ScriptedProver::generating(artifact(61))).await;
        ready_to_confirm(&wf, "123").await;

        let tx_hash = wf.confirm(SubmissionPath::Relay).await.unwrap();

        let snapshot = wf.snapshot();
        assert_eq!(
            snapshot.state,
            WorkflowState::Submitted {
                tx_hash,
                path: SubmissionPath::Relay
            }
        );
        assert!(snapshot.status.contains(&tx_hash.to_string()));
        assert!(network.ledger.is_registered(&Identifier([61; 32])));
        assert!(wf
            .history()
            .contains(&WorkflowState::Submitting(SubmissionPath::Relay)));
    }

    #[tokio::test]
    async fn test_self_round_trip() {
        let network = Network::start().await;
        let wf = network.holder(ScriptedProver::generating(artifact(62))).await;
        ready_to_confirm(&wf, "0x7b").await;

        let tx_hash = wf.confirm(SubmissionPath::SelfSubmit).await.unwrap();
        assert_eq!(
            wf.state(),
            WorkflowState::Submitted {
                tx_hash,
                path: SubmissionPath::SelfSubmit
            }
        );
        // Submitted by the holder, not the relay
        assert_eq!(network.relay.in_flight(), 0);
        assert!(network.ledger.is_registered(&Identifier([62; 32])));
    }

    #[tokio::test]
    async fn test_same_identifier_race_one_winner() {
        let network = Network::start().await;
        let a = network.holder(ScriptedProver::generating(artifact(63))).await;
        let b = network.holder(ScriptedProver::generating(artifact(63))).await;
        ready_to_confirm(&a, "101").await;
        ready_to_confirm(&b, "202").await;

        let (ra, rb) = tokio::join!(
            a.confirm(SubmissionPath::Relay),
            b.confirm(SubmissionPath::Relay)
        );

        let (winner, loser, err) = match (ra, rb) {
            (Ok(_), Err(e)) => (&a, &b, e),
            (Err(e), Ok(_)) => (&b, &a, e),
            other => panic!("expected exactly one success, got {other:?}"),
        };
        assert_eq!(err.kind(), ErrorKind::DuplicateIdentifier);
        assert!(matches!(winner.state(), WorkflowState::Submitted { .. }));
        assert_eq!(loser.state(), WorkflowState::Idle);
        assert!(loser.snapshot().status.starts_with("Registration failed"));
        assert_eq!(network.ledger.registered_count(), 1);
    }

    #[tokio::test]
    async fn test_rejection_returns_to_idle() {
        let network = Network::start().await;
        let wf = network.holder(ScriptedProver::rejecting()).await;

        wf.set_commitment("123").unwrap();
        settle_commitment(&wf).await;
        wf.request_proof().await.unwrap();

        let snapshot = tokio::time::timeout(WAIT, wf.wait_for(|s| *s == WorkflowState::Idle))
            .await
            .unwrap();
        assert_eq!(snapshot.status, "User rejected the request");
        assert_eq!(snapshot.status, status::PROOF_REJECTED);
        assert!(wf.history().contains(&WorkflowState::ProofRejected));
        assert_eq!(network.ledger.submitted_count(), 0);
    }

    #[tokio::test]
    async fn test_preflight_catches_registered_identifier() {
        let network = Network::start().await;
        gateway(&network.ledger, RELAY_ADDRESS)
            .register_and_confirm(&artifact(64).params, &IdCommitment::from(640))
            .await
            .unwrap();

        let wf = network.holder(ScriptedProver::generating(artifact(64))).await;
        wf.set_commitment("123").unwrap();
        settle_commitment(&wf).await;
        wf.request_proof().await.unwrap();

        let snapshot = tokio::time::timeout(WAIT, wf.wait_for(|s| *s == WorkflowState::Idle))
            .await
            .unwrap();
        assert_eq!(snapshot.status, status::IDENTIFIER_TAKEN);
        assert_eq!(snapshot.last_error.unwrap().kind, ErrorKind::DuplicateIdentifier);

        // Nothing to confirm
        let err = wf.confirm(SubmissionPath::Relay).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_silent_relay_times_out() {
        let network = Network::start().await;
        let wf = network.holder(ScriptedProver::generating(artifact(65))).await;
        ready_to_confirm(&wf, "123").await;

        // The relay stops listening
        network.relay_bus.stop().await;

        let err = wf.confirm(SubmissionPath::Relay).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(wf.state(), WorkflowState::Idle);
        assert!(wf.history().iter().any(|s| matches!(
            s,
            WorkflowState::SubmissionFailed {
                kind: ErrorKind::Timeout,
                ..
            }
        )));
        assert!(!gateway(&network.ledger, HOLDER_ADDRESS)
            .check_identifier(&Identifier([65; 32]))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_retry_after_prover_error() {
        let network = Network::start().await;
        let prover = ScriptedProver::generating(artifact(66));
        prover.push_script(vec![
            ProverEvent::BridgeConnected,
            ProverEvent::Error("bridge lost".into()),
        ]);
        let wf = network.holder(prover).await;

        wf.set_commitment("123").unwrap();
        settle_commitment(&wf).await;
        wf.request_proof().await.unwrap();
        let snapshot = tokio::time::timeout(WAIT, wf.wait_for(|s| *s == WorkflowState::Idle))
            .await
            .unwrap();
        assert_eq!(snapshot.status, status::PROOF_ERROR);

        // The same workflow starts over and completes
        ready_to_confirm(&wf, "123").await;
        assert!(wf.confirm(SubmissionPath::Relay).await.is_ok());
    }
}
