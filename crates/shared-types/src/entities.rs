//! # Core Domain Entities
//!
//! - **Holder side**: [`IdCommitment`]
//! - **Ledger side**: [`Identifier`], [`TxHash`], [`Address`]

use crate::errors::ParseError;
use crate::serde_hex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

/// A 32-byte hash (keccak-256 unless stated otherwise).
pub type Hash = [u8; 32];

/// Order of the BN254 scalar field. Commitments must be strictly below it.
pub const SNARK_SCALAR_FIELD: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

macro_rules! hex_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Parse from a hex string (with or without `0x`).
            pub fn parse(s: &str) -> Result<Self, ParseError> {
                let bytes = serde_hex::decode(s)?;
                let array = <[u8; $len]>::try_from(bytes.as_slice()).map_err(|_| {
                    ParseError::InvalidLength {
                        expected: $len,
                        actual: bytes.len(),
                    }
                })?;
                Ok(Self(array))
            }

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// `0x`-prefixed hex form.
            pub fn to_hex(&self) -> String {
                serde_hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                Self::parse(&s).map_err(D::Error::custom)
            }
        }
    };
}

hex_newtype!(
    /// A 20-byte account address.
    Address,
    20
);

hex_newtype!(
    /// The value the registry contract indexes. At most one successful
    /// registration may ever bind a given identifier.
    Identifier,
    32
);

hex_newtype!(
    /// Hash of a submitted ledger transaction.
    TxHash,
    32
);

/// Holder-chosen commitment, a `uint256` on the ledger.
///
/// Accepted on input as a decimal string or a `0x` hex string; serialized as
/// a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdCommitment(U256);

impl IdCommitment {
    /// Parse a decimal or `0x` hex commitment.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        let value = if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            if digits.is_empty() || digits.len() > 64 {
                return Err(ParseError::InvalidNumber(input.to_string()));
            }
            U256::from_str_radix(digits, 16)
                .map_err(|_| ParseError::InvalidNumber(input.to_string()))?
        } else {
            U256::from_dec_str(s).map_err(|_| ParseError::InvalidNumber(input.to_string()))?
        };
        Ok(Self(value))
    }

    /// Underlying integer.
    pub fn value(&self) -> U256 {
        self.0
    }

    /// Whether the commitment lies in `(0, SNARK_SCALAR_FIELD)`.
    pub fn is_in_field(&self) -> bool {
        match U256::from_dec_str(SNARK_SCALAR_FIELD) {
            Ok(field) => !self.0.is_zero() && self.0 < field,
            Err(_) => false,
        }
    }

    /// Big-endian 32-byte encoding (ABI `uint256`).
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.0.to_big_endian(&mut out);
        out
    }
}

impl From<U256> for IdCommitment {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for IdCommitment {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl FromStr for IdCommitment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IdCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for IdCommitment {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for IdCommitment {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(d)? {
            Repr::Text(s) => Self::parse(&s).map_err(D::Error::custom),
            Repr::Number(n) => Ok(Self::from(n)),
        }
    }
}
