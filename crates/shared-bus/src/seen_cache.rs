//! # Seen-Message Cache
//!
//! Content-id deduplication for the dispatcher.
//!
//! ## Design
//!
//! - Envelopes are accepted only within a timestamp window (`max_age_secs`
//!   past, `max_future_skew_secs` future). The timestamp checked is the one
//!   inside the message id, so an id garbage-collected after the window
//!   cannot come back with a fresher clock
//! - Ids are garbage-collected once older than the window
//! - Capacity bounds memory; the oldest ids are evicted first. An evicted id
//!   that is redelivered while still inside the window is accepted again, so
//!   capacity must cover the traffic expected within `max_age_secs`

use crate::envelope::MessageId;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Why an envelope was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeenError {
    /// Already delivered.
    #[error("Message {id} was already delivered")]
    Duplicate { id: MessageId },

    /// The message timestamp is too old.
    #[error("Message timestamp {timestamp} is too old (threshold: {threshold})")]
    TooOld { timestamp: u64, threshold: u64 },

    /// The message timestamp is in the future.
    #[error("Message timestamp {timestamp} is in the future (threshold: {threshold})")]
    FromFuture { timestamp: u64, threshold: u64 },
}

/// Bounded, time-windowed set of delivered message ids.
///
/// All timestamps are seconds since the Unix epoch.
pub struct SeenMessageCache {
    /// Message id -> envelope timestamp.
    entries: HashMap<MessageId, u64>,

    /// Insertion order, for capacity eviction.
    order: VecDeque<MessageId>,

    capacity: usize,

    /// Oldest accepted envelope age.
    max_age_secs: u64,

    /// Largest accepted clock skew into the future.
    max_future_skew_secs: u64,

    last_gc: u64,

    gc_interval_secs: u64,
}

impl SeenMessageCache {
    pub const DEFAULT_CAPACITY: usize = 4096;
    pub const DEFAULT_MAX_AGE: u64 = 600;
    pub const DEFAULT_MAX_FUTURE_SKEW: u64 = 30;
    pub const DEFAULT_GC_INTERVAL: u64 = 30;

    #[must_use]
    pub fn new() -> Self {
        Self::with_config(
            Self::DEFAULT_CAPACITY,
            Self::DEFAULT_MAX_AGE,
            Self::DEFAULT_MAX_FUTURE_SKEW,
            Self::DEFAULT_GC_INTERVAL,
        )
    }

    #[must_use]
    pub fn with_config(
        capacity: usize,
        max_age_secs: u64,
        max_future_skew_secs: u64,
        gc_interval_secs: u64,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            max_age_secs,
            max_future_skew_secs,
            last_gc: 0,
            gc_interval_secs,
        }
    }

    /// Validate the timestamp window, then record `id` if unseen.
    ///
    /// # Errors
    ///
    /// - `SeenError::TooOld` / `SeenError::FromFuture` - outside the window
    /// - `SeenError::Duplicate` - the id was already recorded
    pub fn validate_and_add(
        &mut self,
        id: MessageId,
        timestamp: u64,
        now: u64,
    ) -> Result<(), SeenError> {
        // Window check first; it bounds everything after it
        let min_valid = now.saturating_sub(self.max_age_secs);
        let max_valid = now.saturating_add(self.max_future_skew_secs);

        if timestamp < min_valid {
            return Err(SeenError::TooOld {
                timestamp,
                threshold: min_valid,
            });
        }
        if timestamp > max_valid {
            return Err(SeenError::FromFuture {
                timestamp,
                threshold: max_valid,
            });
        }

        if now.saturating_sub(self.last_gc) >= self.gc_interval_secs {
            self.garbage_collect(now);
            self.last_gc = now;
        }

        if self.entries.contains_key(&id) {
            return Err(SeenError::Duplicate { id });
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.entries.insert(id, timestamp);
        self.order.push_back(id);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop ids whose envelopes fell out of the acceptance window.
    fn garbage_collect(&mut self, now: u64) {
        let expiry = now.saturating_sub(self.max_age_secs);
        self.entries.retain(|_, ts| *ts >= expiry);
        let entries = &self.entries;
        self.order.retain(|id| entries.contains_key(id));
    }
}

impl Default for SeenMessageCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn id(n: u8) -> MessageId {
        MessageId([n; 32])
    }

    #[test]
    fn test_first_sighting_accepted() {
        let mut cache = SeenMessageCache::new();
        assert!(cache.validate_and_add(id(1), NOW, NOW).is_ok());
        assert!(cache.contains(&id(1)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut cache = SeenMessageCache::new();
        cache.validate_and_add(id(1), NOW, NOW).unwrap();
        assert!(matches!(
            cache.validate_and_add(id(1), NOW, NOW + 1),
            Err(SeenError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_too_old_rejected() {
        let mut cache = SeenMessageCache::with_config(16, 60, 10, 10);
        assert!(matches!(
            cache.validate_and_add(id(1), NOW - 120, NOW),
            Err(SeenError::TooOld { .. })
        ));
    }

    #[test]
    fn test_from_future_rejected() {
        let mut cache = SeenMessageCache::with_config(16, 60, 10, 10);
        assert!(matches!(
            cache.validate_and_add(id(1), NOW + 60, NOW),
            Err(SeenError::FromFuture { .. })
        ));
        assert!(cache.validate_and_add(id(2), NOW + 5, NOW).is_ok());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = SeenMessageCache::with_config(2, 600, 30, 30);
        cache.validate_and_add(id(1), NOW, NOW).unwrap();
        cache.validate_and_add(id(2), NOW, NOW).unwrap();
        cache.validate_and_add(id(3), NOW, NOW).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&id(1)));
        assert!(cache.contains(&id(3)));
    }

    #[test]
    fn test_garbage_collection_drops_expired() {
        let mut cache = SeenMessageCache::with_config(16, 60, 10, 10);
        cache.validate_and_add(id(1), NOW, NOW).unwrap();
        cache.validate_and_add(id(2), NOW + 100, NOW + 100).unwrap();
        assert!(!cache.contains(&id(1)));
        assert_eq!(cache.len(), 1);
    }
}
