//! # Relay API
//!
//! Thin HTTP surface next to the relay's pub/sub handlers: a direct token
//! mint endpoint, a health probe and Prometheus metrics.
//!
//! Mint outcomes are reported in the body (`{success, hash|error}`); only
//! malformed requests get a 400.

pub mod domain;
pub mod ports;
pub mod router;
pub mod service;

pub use domain::config::{ApiConfig, ConfigError};
pub use domain::error::ApiError;
pub use ports::Minter;
pub use router::{build_router, HealthReply, MintBody, MintReply};
pub use service::RelayApi;
