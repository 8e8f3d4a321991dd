//! Adapters: relay client over the dispatcher, scripted prover.

pub mod pending;
pub mod relay_client;
pub mod scripted_prover;
