//! Ports layer: workflow API, prover and relay SPIs.

pub mod inbound;
pub mod outbound;
