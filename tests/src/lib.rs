//! # Personhood Registry Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Shared network harness and proof fixtures
//! └── integration/
//!     ├── commitment.rs # Commitment checks and classification properties
//!     ├── dispatch.rs   # Dedup and relay answering over the transport
//!     ├── ledger.rs     # Gateway reads and writes against the ledger
//!     └── flows.rs      # Full registration attempts, both paths
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pr-tests
//! cargo test -p pr-tests integration::flows::
//! ```

pub mod fixtures;
pub mod integration;
