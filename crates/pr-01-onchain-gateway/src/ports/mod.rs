//! Ports layer: gateway API and ledger backend SPI.

pub mod inbound;
pub mod outbound;
