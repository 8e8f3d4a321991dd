//! Cross-component scenarios.

pub mod commitment;
pub mod dispatch;
pub mod flows;
pub mod ledger;
