//! # In-Memory Ledger
//!
//! A single-process model of the registry and token contracts. Every
//! submission is mined immediately into its own block unless a fault is
//! injected. Handles created with [`InMemoryLedger::as_signer`] share state
//! and differ only in the signing address.

use crate::domain::entities::{LedgerEvent, Receipt, TxStatus};
use crate::ports::outbound::{LedgerBackend, LedgerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    keccak256, Address, IdCommitment, Identifier, ProofVerificationParams, TxHash, U256,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Faults applied to the next submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerFault {
    /// Refuse the transaction before it is mined.
    Reject(String),
    /// Mine the transaction as reverted.
    Revert(String),
    /// Accept the transaction but never publish its receipt.
    Withhold,
}

#[derive(Debug, Default)]
struct LedgerState {
    identifiers: HashSet<Identifier>,
    members: HashSet<IdCommitment>,
    balances: HashMap<Address, U256>,
    receipts: HashMap<TxHash, Receipt>,
    withheld: HashMap<TxHash, Receipt>,
    faults: Vec<LedgerFault>,
    unavailable: bool,
    block_number: u64,
    nonce: u64,
}

/// Shared in-memory contract state plus the address this handle signs with.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    owner: Address,
    signer: Address,
}

impl InMemoryLedger {
    /// Deploy a fresh ledger owned by (and signing as) `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            owner,
            signer: owner,
        }
    }

    /// Another handle on the same state, signing as `signer`.
    pub fn as_signer(&self, signer: Address) -> Self {
        Self {
            state: Arc::clone(&self.state),
            owner: self.owner,
            signer,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Queue a fault for the next submission.
    pub fn inject(&self, fault: LedgerFault) {
        self.state.lock().faults.push(fault);
    }

    /// Make every call fail with [`LedgerError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Publish receipts that were withheld.
    pub fn release_withheld(&self) -> usize {
        let mut state = self.state.lock();
        let withheld: Vec<_> = state.withheld.drain().collect();
        let count = withheld.len();
        state.receipts.extend(withheld);
        count
    }

    pub fn is_registered(&self, identifier: &Identifier) -> bool {
        self.state.lock().identifiers.contains(identifier)
    }

    pub fn registered_count(&self) -> usize {
        self.state.lock().identifiers.len()
    }

    pub fn balance_of(&self, address: &Address) -> U256 {
        self.state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Transactions accepted so far, mined or withheld.
    pub fn submitted_count(&self) -> usize {
        let state = self.state.lock();
        state.receipts.len() + state.withheld.len()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.state.lock().unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".into()));
        }
        Ok(())
    }

    /// Run `execute` against the state and mine the result into a new block.
    fn submit<F>(&self, execute: F) -> Result<TxHash, LedgerError>
    where
        F: FnOnce(&mut LedgerState, Address) -> Result<Vec<LedgerEvent>, String>,
    {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(LedgerError::Unavailable("in-memory ledger offline".into()));
        }

        let fault = if state.faults.is_empty() {
            None
        } else {
            Some(state.faults.remove(0))
        };
        if let Some(LedgerFault::Reject(reason)) = &fault {
            return Err(LedgerError::Rejected(reason.clone()));
        }

        state.nonce += 1;
        let tx_hash = TxHash(keccak256([
            self.signer.as_bytes().as_slice(),
            &state.nonce.to_be_bytes()[..],
        ]));

        let outcome = match &fault {
            Some(LedgerFault::Revert(reason)) => Err(reason.clone()),
            _ => execute(&mut *state, self.signer),
        };

        state.block_number += 1;
        let (status, events, revert_reason) = match outcome {
            Ok(events) => (TxStatus::Success, events, None),
            Err(reason) => (TxStatus::Reverted, Vec::new(), Some(reason)),
        };
        let receipt = Receipt {
            tx_hash,
            block_number: state.block_number,
            status,
            events,
            revert_reason,
        };

        if fault == Some(LedgerFault::Withhold) {
            state.withheld.insert(tx_hash, receipt);
        } else {
            state.receipts.insert(tx_hash, receipt);
        }
        Ok(tx_hash)
    }
}

#[async_trait]
impl LedgerBackend for InMemoryLedger {
    async fn is_valid_id_commitment(&self, commitment: &IdCommitment) -> Result<bool, LedgerError> {
        self.check_available()?;
        Ok(commitment.is_in_field())
    }

    async fn is_in_membership_set(&self, commitment: &IdCommitment) -> Result<bool, LedgerError> {
        self.check_available()?;
        Ok(self.state.lock().members.contains(commitment))
    }

    async fn check_identifier(&self, identifier: &Identifier) -> Result<bool, LedgerError> {
        self.check_available()?;
        Ok(self.is_registered(identifier))
    }

    async fn check_identifiers(&self, identifiers: &[Identifier]) -> Result<Vec<bool>, LedgerError> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(identifiers
            .iter()
            .map(|id| state.identifiers.contains(id))
            .collect())
    }

    async fn submit_register(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
        rate_limit: u32,
    ) -> Result<TxHash, LedgerError> {
        let params = params.clone();
        let commitment = *commitment;
        self.submit(move |state, _| {
            if rate_limit == 0 {
                return Err("Invalid rate limit".into());
            }
            if !commitment.is_in_field() {
                return Err("Invalid idCommitment".into());
            }
            if state.members.contains(&commitment) {
                return Err("idCommitment already registered".into());
            }
            params.validate().map_err(|e| e.message)?;
            let identifier = params.identifier().map_err(|e| e.message)?;

            // Already bound: the call succeeds and changes nothing
            if !state.identifiers.insert(identifier) {
                return Ok(Vec::new());
            }
            state.members.insert(commitment);
            Ok(vec![LedgerEvent::IdentifierRegistered {
                identifier,
                id_commitment: commitment,
            }])
        })
    }

    async fn submit_mint(&self, to: &Address, amount: U256) -> Result<TxHash, LedgerError> {
        let to = *to;
        self.submit(move |state, _| {
            let balance = state.balances.entry(to).or_default();
            *balance = balance
                .checked_add(amount)
                .ok_or_else(|| "balance overflow".to_string())?;
            Ok(vec![LedgerEvent::Minted { to, amount }])
        })
    }

    async fn submit_reset(&self) -> Result<TxHash, LedgerError> {
        let owner = self.owner;
        self.submit(move |state, caller| {
            if caller != owner {
                return Err("Caller is not the owner".into());
            }
            state.identifiers.clear();
            Ok(vec![LedgerEvent::IdentifiersReset { caller }])
        })
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        self.check_available()?;
        Ok(self.state.lock().receipts.get(tx_hash).cloned())
    }

    fn signer(&self) -> Address {
        self.signer
    }
}
