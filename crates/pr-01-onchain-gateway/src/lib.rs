//! # On-Chain Gateway (PR-01)
//!
//! Narrow client for the identifier registry and token contracts.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): receipts, ledger events, errors, configuration
//! - **Ports Layer** (`ports/`): `RegistryGateway`/`TokenGateway` (inbound),
//!   `LedgerBackend` (outbound)
//! - **Service Layer** (`service.rs`): `OnChainGateway`, confirmation waits
//! - **Adapters** (`adapters/`): in-memory contract ledger, EVM JSON-RPC backend
//!
//! ## Registration Semantics
//!
//! ```text
//! register() ──▶ TxHash ──▶ wait_for_confirmation() ──▶ Receipt
//!                                  │                      │
//!                         Timeout ◀┘     reverted ──▶ TransactionFailed
//!                                                         │
//!                        IdentifierRegistered log? ──no──▶ DuplicateIdentifier
//! ```
//!
//! A registration for an identifier that is already bound is mined but does
//! nothing. Only the `IdentifierRegistered` log proves the binding happened.
//!
//! ## Identities
//!
//! Each `OnChainGateway` wraps one backend, and each backend signs with one
//! key. Holders and the relay each build their own.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::in_memory::{InMemoryLedger, LedgerFault};
#[cfg(feature = "evm")]
pub use adapters::evm::{EvmBackend, EvmConfig};
pub use domain::config::{ConfigError, GatewayConfig};
pub use domain::entities::{ConfirmedRegistration, LedgerEvent, Receipt, TxStatus};
pub use domain::errors::GatewayError;
pub use ports::inbound::{RegistryGateway, TokenGateway};
pub use ports::outbound::{LedgerBackend, LedgerError};
pub use service::OnChainGateway;
