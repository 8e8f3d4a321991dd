//! # Personhood Relay Runtime
//!
//! Process wiring for the relay:
//!
//! ```text
//!   Waku / in-memory transport
//!        │                │
//!  registration topic   mint topic
//!        │                │
//!   ┌────▼────────────────▼────┐      ┌───────────────┐
//!   │      RelayListener       │      │   RelayApi    │ ◄── POST /api/mint
//!   └────────────┬─────────────┘      └──────┬────────┘
//!                └──────────┬────────────────┘
//!                    ┌──────▼───────┐
//!                    │ RelayService │
//!                    └──────┬───────┘
//!                    ┌──────▼─────────┐
//!                    │ OnChainGateway │ ── EVM JSON-RPC / in-memory ledger
//!                    └────────────────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load `.env`, read [`RuntimeConfig`] from the environment
//! 2. Initialize telemetry
//! 3. Connect the ledger backend
//! 4. Start dispatchers and attach relay handlers
//! 5. Serve HTTP until Ctrl+C

pub mod config;
pub mod runtime;

pub use config::{LedgerSettings, RuntimeConfig, RuntimeConfigError};
pub use runtime::RelayRuntime;
