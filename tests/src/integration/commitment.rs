//! # Commitment Checks
//!
//! A commitment is classified as invalid (unparsable, zero, or outside the
//! scalar field), taken (already a member) or valid.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pr_01_onchain_gateway::{InMemoryLedger, RegistryGateway};
    use pr_02_registration_workflow::{status, RegistrationApi, ScriptedProver, WorkflowState};
    use proptest::prelude::*;
    use shared_types::{IdCommitment, U256, SNARK_SCALAR_FIELD};

    #[tokio::test]
    async fn test_123_is_valid_and_available() {
        let network = Network::start().await;
        let wf = network.holder(ScriptedProver::generating(artifact(1))).await;

        wf.set_commitment("123").unwrap();
        let snapshot = settle_commitment(&wf).await;
        assert_eq!(snapshot.state, WorkflowState::CommitmentValid);
        assert_eq!(snapshot.status, "ID Commitment is valid and available");
        assert_eq!(snapshot.status, status::COMMITMENT_VALID);
    }

    #[tokio::test]
    async fn test_registered_commitment_is_taken() {
        let network = Network::start().await;
        gateway(&network.ledger, HOLDER_ADDRESS)
            .register_and_confirm(&artifact(2).params, &IdCommitment::from(4242))
            .await
            .unwrap();

        let wf = network.holder(ScriptedProver::generating(artifact(3))).await;
        wf.set_commitment("0x1092").unwrap(); // 4242
        assert_eq!(settle_commitment(&wf).await.state, WorkflowState::CommitmentTaken);
    }

    fn field() -> U256 {
        U256::from_dec_str(SNARK_SCALAR_FIELD).unwrap()
    }

    fn ledger_validity(value: U256) -> bool {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let ledger = InMemoryLedger::new(RELAY_ADDRESS);
        runtime
            .block_on(gateway(&ledger, RELAY_ADDRESS).check_validity(&IdCommitment::from(value)))
            .unwrap()
    }

    proptest! {
        #[test]
        fn prop_nonzero_below_field_is_valid(raw in any::<[u64; 4]>()) {
            let value = U256(raw) % field();
            prop_assume!(!value.is_zero());
            prop_assert!(IdCommitment::from(value).is_in_field());
            prop_assert!(ledger_validity(value));
        }

        #[test]
        fn prop_field_and_above_is_invalid(offset in any::<u128>()) {
            let value = field() + U256::from(offset);
            prop_assert!(!IdCommitment::from(value).is_in_field());
            prop_assert!(!ledger_validity(value));
        }

        #[test]
        fn prop_decimal_and_hex_forms_agree(raw in any::<[u64; 4]>()) {
            let value = U256(raw);
            let decimal = IdCommitment::parse(&value.to_string()).unwrap();
            let hex = IdCommitment::parse(&format!("0x{value:x}")).unwrap();
            prop_assert_eq!(decimal, hex);
            prop_assert_eq!(decimal.value(), value);
        }

        #[test]
        fn prop_non_numeric_input_never_parses(s in "[a-zA-Z_ -]{1,24}") {
            prop_assume!(!s.trim().is_empty());
            prop_assert!(IdCommitment::parse(&s).is_err());
        }
    }
}
