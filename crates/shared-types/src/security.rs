//! # Hashing and Envelope Authentication
//!
//! - `keccak256` derives content ids and ABI selectors.
//! - HMAC-SHA256 authenticates dispatch envelopes between parties sharing
//!   a key. Verification is constant-time (`Mac::verify_slice`).

use crate::entities::Hash;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Keccak-256 of the concatenation of `parts`.
pub fn keccak256<I, T>(parts: I) -> Hash
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part.as_ref());
    }
    hasher.finalize().into()
}

/// HMAC-SHA256 tag over `message`.
///
/// Returns `None` only if the MAC cannot be keyed, which HMAC never refuses.
pub fn sign_message(message: &[u8], key: &[u8]) -> Option<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(message);
    Some(mac.finalize().into_bytes().into())
}

/// Verify an HMAC-SHA256 tag.
pub fn verify_message(message: &[u8], tag: &[u8], key: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(tag).is_ok()
}

/// Current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    current_timestamp_ms() / 1000
}
