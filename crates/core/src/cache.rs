//! Timestamped cache entries for re-derivable values.
//!
//! Cached values are never a source of truth: a reader checks freshness
//! against its own age budget and recomputes when the entry is stale.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A value together with the moment it was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedValue<T> {
    pub value: T,
    pub computed_at: Timestamp,
}

impl<T> CachedValue<T> {
    pub fn new(value: T, computed_at: Timestamp) -> Self {
        Self { value, computed_at }
    }

    /// Time elapsed since computation, as seen at `now`.
    pub fn age(&self, now: Timestamp) -> Duration {
        now - self.computed_at
    }

    /// True when the entry is no older than `max_age` at `now`.
    ///
    /// Entries stamped in the future (clock skew between writers) are
    /// treated as stale.
    pub fn is_fresh(&self, max_age: Duration, now: Timestamp) -> bool {
        let age = self.age(now);
        age >= Duration::zero() && age <= max_age
    }
}
