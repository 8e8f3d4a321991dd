//! Ledger-side entities.

use shared_types::{Address, IdCommitment, Identifier, TxHash, U256};

/// Execution status of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted,
}

/// Contract logs the gateway understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// An identifier was bound by this transaction.
    IdentifierRegistered {
        identifier: Identifier,
        id_commitment: IdCommitment,
    },
    /// The owner cleared every registered identifier.
    IdentifiersReset { caller: Address },
    /// Tokens were minted.
    Minted { to: Address, amount: U256 },
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: TxStatus,
    pub events: Vec<LedgerEvent>,
    /// Decoded revert reason, when the ledger reports one.
    pub revert_reason: Option<String>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// Whether this transaction bound `identifier`.
    pub fn registered(&self, identifier: &Identifier) -> bool {
        self.events.iter().any(|e| {
            matches!(e, LedgerEvent::IdentifierRegistered { identifier: id, .. } if id == identifier)
        })
    }
}

/// A registration whose binding is confirmed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedRegistration {
    pub identifier: Identifier,
    pub tx_hash: TxHash,
    pub block_number: u64,
}
