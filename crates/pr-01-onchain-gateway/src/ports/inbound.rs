//! # Inbound Ports (API)
//!
//! Operations the registration workflow and the relay call.

use crate::domain::entities::{ConfirmedRegistration, Receipt};
use crate::domain::errors::GatewayError;
use async_trait::async_trait;
use shared_types::{Address, IdCommitment, Identifier, ProofVerificationParams, TxHash, U256};

/// Registry contract operations.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Whether the commitment is a well-formed field element.
    async fn check_validity(&self, commitment: &IdCommitment) -> Result<bool, GatewayError>;

    /// Whether the commitment is already in the membership set.
    async fn check_membership(&self, commitment: &IdCommitment) -> Result<bool, GatewayError>;

    /// Whether the identifier is already registered.
    async fn check_identifier(&self, identifier: &Identifier) -> Result<bool, GatewayError>;

    /// Batch form of [`check_identifier`](Self::check_identifier).
    async fn check_identifiers(
        &self,
        identifiers: &[Identifier],
    ) -> Result<Vec<bool>, GatewayError>;

    /// Submit a registration. Returns as soon as the ledger accepts it.
    async fn register(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
    ) -> Result<TxHash, GatewayError>;

    /// Wait until `tx_hash` is mined, failing on revert or timeout.
    async fn wait_for_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, GatewayError>;

    /// Register, confirm, and check that the binding actually happened.
    async fn register_and_confirm(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
    ) -> Result<ConfirmedRegistration, GatewayError>;

    /// Owner-only reset of every registered identifier.
    async fn reset_identifiers(&self) -> Result<Receipt, GatewayError>;
}

/// Token contract operations.
#[async_trait]
pub trait TokenGateway: Send + Sync {
    /// Mint `amount` to `to` and wait for confirmation.
    async fn mint(&self, to: &Address, amount: U256) -> Result<Receipt, GatewayError>;
}
