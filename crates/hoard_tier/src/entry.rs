// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    ops::Deref,
    time::{Duration, SystemTime},
};

/// A stored value with its timestamp and time-to-live.
///
/// Timestamps are wall-clock [`SystemTime`] values because entries written to persistent or
/// shared tiers are read back by other processes.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hoard_tier::CacheEntry;
///
/// let entry = CacheEntry::new(42);
/// assert_eq!(*entry.value(), 42);
///
/// let entry = CacheEntry::with_ttl("data".to_string(), Duration::from_secs(60));
/// assert_eq!(entry.ttl(), Some(Duration::from_secs(60)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    cached_at: Option<SystemTime>,
    ttl: Option<Duration>,
}

impl<V> CacheEntry<V> {
    /// Creates an entry that never expires on its own.
    ///
    /// The timestamp is stamped by whoever inserts the entry.
    pub fn new(value: V) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: None,
        }
    }

    /// Creates an entry that lives for `ttl` after it is cached.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        Self {
            value,
            cached_at: None,
            ttl: Some(ttl),
        }
    }

    /// Creates an entry with an explicit timestamp, typically when rebuilding one from storage.
    ///
    /// ```
    /// use std::time::SystemTime;
    ///
    /// use hoard_tier::CacheEntry;
    ///
    /// let at = SystemTime::UNIX_EPOCH;
    /// let entry = CacheEntry::with_cached_at(42, at);
    /// assert_eq!(entry.cached_at(), Some(at));
    /// ```
    pub fn with_cached_at(value: V, cached_at: SystemTime) -> Self {
        Self {
            value,
            cached_at: Some(cached_at),
            ttl: None,
        }
    }

    /// Returns when this entry was cached, if stamped.
    #[must_use]
    pub fn cached_at(&self) -> Option<SystemTime> {
        self.cached_at
    }

    /// Stamps the entry.
    pub fn set_cached_at(&mut self, cached_at: SystemTime) {
        self.cached_at = Some(cached_at);
    }

    /// Stamps the entry unless it already carries a timestamp.
    pub fn ensure_cached_at(&mut self, now: SystemTime) {
        if self.cached_at.is_none() {
            self.cached_at = Some(now);
        }
    }

    /// Returns the per-entry TTL, if set.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Sets the per-entry TTL.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = Some(ttl);
    }

    /// Returns the instant this entry stops being valid.
    ///
    /// `None` when the entry has no TTL or has not been stamped.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.cached_at?.checked_add(self.ttl?)
    }

    /// Returns `true` if the entry has a deadline and `now` is past it.
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at().is_some_and(|deadline| now > deadline)
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns a reference to the stored value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Transforms the value while keeping the timestamp and TTL.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> CacheEntry<U> {
        CacheEntry {
            value: f(self.value),
            cached_at: self.cached_at,
            ttl: self.ttl,
        }
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<V> From<V> for CacheEntry<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn expires_at_requires_stamp_and_ttl() {
        let unstamped = CacheEntry::with_ttl(1, Duration::from_secs(5));
        assert_eq!(unstamped.expires_at(), None);

        let mut stamped = CacheEntry::new(1);
        stamped.set_cached_at(at(10));
        assert_eq!(stamped.expires_at(), None);

        stamped.set_ttl(Duration::from_secs(5));
        assert_eq!(stamped.expires_at(), Some(at(15)));
    }

    #[test]
    fn is_expired_at_is_strictly_after_deadline() {
        let mut entry = CacheEntry::with_ttl("v", Duration::from_secs(5));
        entry.set_cached_at(at(100));

        assert!(!entry.is_expired_at(at(104)));
        assert!(!entry.is_expired_at(at(105)));
        assert!(entry.is_expired_at(at(106)));
    }

    #[test]
    fn ensure_cached_at_keeps_existing_stamp() {
        let mut entry = CacheEntry::with_cached_at(1, at(1));
        entry.ensure_cached_at(at(2));
        assert_eq!(entry.cached_at(), Some(at(1)));

        let mut fresh = CacheEntry::new(1);
        fresh.ensure_cached_at(at(2));
        assert_eq!(fresh.cached_at(), Some(at(2)));
    }

    #[test]
    fn map_preserves_metadata() {
        let mut entry = CacheEntry::with_ttl(2, Duration::from_secs(3));
        entry.set_cached_at(at(7));

        let mapped = entry.map(|v| v.to_string());
        assert_eq!(mapped.value(), "2");
        assert_eq!(mapped.ttl(), Some(Duration::from_secs(3)));
        assert_eq!(mapped.cached_at(), Some(at(7)));
    }

    #[test]
    fn deref_and_from() {
        let entry: CacheEntry<String> = "hello".to_string().into();
        assert_eq!(entry.len(), 5);
        assert_eq!(entry.into_value(), "hello");
    }
}
