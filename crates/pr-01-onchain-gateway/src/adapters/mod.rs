//! Ledger backend adapters.

pub mod in_memory;

#[cfg(feature = "evm")]
pub mod evm;
