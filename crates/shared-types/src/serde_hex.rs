//! `0x`-prefixed hex serde helpers for byte fields.

use crate::entities::Hash;
use crate::errors::ParseError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Decode a hex string with an optional `0x` prefix.
pub fn decode(s: &str) -> Result<Vec<u8>, ParseError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))
}

/// Decode a hex string that must hold exactly 32 bytes.
pub fn decode_fixed32(s: &str) -> Result<Hash, ParseError> {
    let bytes = decode(s)?;
    <Hash>::try_from(bytes.as_slice()).map_err(|_| ParseError::InvalidLength {
        expected: 32,
        actual: bytes.len(),
    })
}

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn encode<T: AsRef<[u8]>>(bytes: T) -> String {
    format!("0x{}", hex::encode(bytes.as_ref()))
}

/// Variable-length byte strings.
pub mod bytes {
    use super::*;

    pub fn serialize<T: AsRef<[u8]>, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        decode(&s).map_err(D::Error::custom)
    }
}

/// `bytes32` values.
pub mod fixed32 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Hash, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(d)?;
        decode_fixed32(&s).map_err(D::Error::custom)
    }
}

/// `bytes32[]` values.
pub mod fixed32_vec {
    use super::*;

    pub fn serialize<S: Serializer>(values: &[Hash], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(values.iter().map(encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Hash>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| decode_fixed32(s).map_err(D::Error::custom))
            .collect()
    }
}
