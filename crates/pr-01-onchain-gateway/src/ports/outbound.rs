//! # Outbound Ports (SPI)
//!
//! What the gateway needs from a ledger: contract reads, signed
//! submissions and receipt lookups.

use crate::domain::entities::Receipt;
use async_trait::async_trait;
use shared_types::{Address, IdCommitment, Identifier, ProofVerificationParams, TxHash, U256};
use thiserror::Error;

/// Ledger backend errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// RPC endpoint unreachable or erroring
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused the transaction before mining
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// A response could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

/// Contract access bound to one signing identity.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// `isValidIdCommitment(uint256)`
    async fn is_valid_id_commitment(&self, commitment: &IdCommitment) -> Result<bool, LedgerError>;

    /// `isInMembershipSet(uint256)`
    async fn is_in_membership_set(&self, commitment: &IdCommitment) -> Result<bool, LedgerError>;

    /// `checkIdentifier(bytes32)`
    async fn check_identifier(&self, identifier: &Identifier) -> Result<bool, LedgerError>;

    /// `checkIdentifiers(bytes32[])`, same order as the input.
    async fn check_identifiers(&self, identifiers: &[Identifier]) -> Result<Vec<bool>, LedgerError>;

    /// Submit `registerIdentifier(params, idCommitment, rateLimit)`.
    async fn submit_register(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
        rate_limit: u32,
    ) -> Result<TxHash, LedgerError>;

    /// Submit `mint(to, amount)` on the token contract.
    async fn submit_mint(&self, to: &Address, amount: U256) -> Result<TxHash, LedgerError>;

    /// Submit the owner-only `reset()`.
    async fn submit_reset(&self) -> Result<TxHash, LedgerError>;

    /// Receipt of a transaction, `None` while it is still pending.
    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, LedgerError>;

    /// Address this backend signs with.
    fn signer(&self) -> Address;
}
