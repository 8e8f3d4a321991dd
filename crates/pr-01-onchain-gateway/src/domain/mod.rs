//! Domain layer: ledger receipts, events and gateway errors.

pub mod config;
pub mod entities;
pub mod errors;
