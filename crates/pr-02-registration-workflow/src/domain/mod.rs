//! Domain layer: workflow states, status messages, errors, configuration.

pub mod config;
pub mod errors;
pub mod state;
