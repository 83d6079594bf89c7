use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

/// Per-address minimum-interval limiter.
///
/// Remembers when each address was last allowed through. An address that
/// comes back before `min_interval` has elapsed is rejected and its
/// timestamp is left untouched, so a client hammering the server is let
/// back in as soon as it pauses for one full interval.
///
/// Entries are never evicted.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    min_interval: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    #[inline]
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `address` must be rejected.
    #[inline]
    pub(crate) fn too_many_requests(&self, address: &str) -> bool {
        self.too_many_requests_at(address, Instant::now())
    }

    pub(crate) fn too_many_requests_at(&self, address: &str, now: Instant) -> bool {
        // The map stays consistent even if a holder panicked
        let mut last_seen = self
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(last) = last_seen.get(address) {
            if now.saturating_duration_since(*last) < self.min_interval {
                return true;
            }
        }

        last_seen.insert(address.to_owned(), now);
        false
    }

    /// Number of addresses currently remembered.
    pub(crate) fn tracked_addresses(&self) -> usize {
        self.last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
