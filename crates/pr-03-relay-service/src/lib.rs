//! # Relay Service
//!
//! Submits registrations and mints on behalf of clients that cannot pay for
//! their own transactions.
//!
//! ```text
//! ┌────────────────┐  register / mint   ┌──────────────┐     ┌──────────────┐
//! │ RelayClient    │ ─────────────────► │ RelayListener│ ──► │ RelayService │
//! │ (workflow)     │ ◄───────────────── │  (adapters)  │     │  (service)   │
//! └────────────────┘  *_response        └──────────────┘     └──────┬───────┘
//!                                                                   │
//!                                                          ┌────────▼───────┐
//!                                                          │ OnChainGateway │
//!                                                          └────────────────┘
//! ```
//!
//! Every request gets exactly one response with the request's correlation
//! id, success or not.

pub mod adapters;
pub mod domain;
pub mod service;

pub use adapters::RelayListener;
pub use domain::config::{ConfigError, RelayConfig};
pub use domain::errors::RelayError;
pub use service::{MintSource, RelayService};
