//! # Shared Types Crate
//!
//! Domain primitives used by every component of the registry.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: commitments, identifiers, transaction hashes
//!   and proof parameters are defined once here.
//! - **Typed Wire Form**: every value that crosses the pub/sub network or the
//!   ledger boundary has an explicit serde representation (`0x` hex for byte
//!   strings, decimal strings for commitments).
//! - **One Error Taxonomy**: [`ErrorKind`] names the failure classes every
//!   crate maps its own errors onto.

pub mod correlation;
pub mod entities;
pub mod errors;
pub mod proof;
pub mod security;
pub mod serde_hex;

pub use correlation::CorrelationId;
pub use entities::*;
pub use errors::*;
pub use proof::{ProofArtifact, ProofVerificationParams};
pub use security::*;
