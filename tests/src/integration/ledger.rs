//! # Gateway Against the Ledger
//!
//! Reads reflect confirmed writes; identifiers bind at most once; the owner
//! alone may reset.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pr_01_onchain_gateway::{
        GatewayError, InMemoryLedger, LedgerFault, RegistryGateway, TokenGateway,
    };
    use shared_types::{Address, ErrorKind, IdCommitment, Identifier, U256};

    #[tokio::test]
    async fn test_check_identifier_round_trip() {
        let ledger = InMemoryLedger::new(RELAY_ADDRESS);
        let gw = gateway(&ledger, HOLDER_ADDRESS);
        let id = Identifier([51; 32]);

        assert!(!gw.check_identifier(&id).await.unwrap());
        let confirmed = gw
            .register_and_confirm(&artifact(51).params, &IdCommitment::from(5151))
            .await
            .unwrap();
        assert_eq!(confirmed.identifier, id);
        assert!(gw.check_identifier(&id).await.unwrap());
        assert!(gw.check_membership(&IdCommitment::from(5151)).await.unwrap());

        // Batch answers follow input order
        let other = Identifier([52; 32]);
        assert_eq!(
            gw.check_identifiers(&[other, id, other]).await.unwrap(),
            vec![false, true, false]
        );
    }

    #[tokio::test]
    async fn test_mined_duplicate_is_not_success() {
        let ledger = InMemoryLedger::new(RELAY_ADDRESS);
        let gw = gateway(&ledger, HOLDER_ADDRESS);
        gw.register_and_confirm(&artifact(53).params, &IdCommitment::from(1))
            .await
            .unwrap();

        // The transaction itself mines
        let tx = gw
            .register(&artifact(53).params, &IdCommitment::from(2))
            .await
            .unwrap();
        let receipt = gw.wait_for_confirmation(&tx).await.unwrap();
        assert!(receipt.is_success());
        assert!(!receipt.registered(&Identifier([53; 32])));

        let err = gw
            .register_and_confirm(&artifact(53).params, &IdCommitment::from(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateIdentifier);
    }

    #[tokio::test]
    async fn test_unconfirmed_transaction_times_out() {
        let ledger = InMemoryLedger::new(RELAY_ADDRESS);
        let gw = gateway(&ledger, HOLDER_ADDRESS);
        ledger.inject(LedgerFault::Withhold);

        let tx = gw
            .register(&artifact(54).params, &IdCommitment::from(54))
            .await
            .unwrap();
        let err = gw.wait_for_confirmation(&tx).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);

        // Mined late: a retry of the wait succeeds
        ledger.release_withheld();
        assert!(gw.wait_for_confirmation(&tx).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_only_owner_resets() {
        let ledger = InMemoryLedger::new(RELAY_ADDRESS);
        let holder = gateway(&ledger, HOLDER_ADDRESS);
        holder
            .register_and_confirm(&artifact(55).params, &IdCommitment::from(55))
            .await
            .unwrap();

        let err = holder.reset_identifiers().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert!(err.to_string().contains("Caller is not the owner"));

        gateway(&ledger, RELAY_ADDRESS).reset_identifiers().await.unwrap();
        assert!(!holder.check_identifier(&Identifier([55; 32])).await.unwrap());
    }

    #[tokio::test]
    async fn test_mint_credits_recipient() {
        let ledger = InMemoryLedger::new(RELAY_ADDRESS);
        let to = Address([0x77; 20]);
        let receipt = gateway(&ledger, RELAY_ADDRESS)
            .mint(&to, U256::from(250))
            .await
            .unwrap();
        assert!(receipt.is_success());
        assert_eq!(ledger.balance_of(&to), U256::from(250));
    }
}
