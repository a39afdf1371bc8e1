// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`InMemoryTier`].
//!
//! Keeps moka's own builder out of the public API.

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use crate::tier::InMemoryTier;

/// Configures an [`InMemoryTier`].
///
/// The default is an unbounded tier with no tier-wide expiry that honors per-entry TTLs.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hoard_memory::InMemoryTier;
///
/// let tier = InMemoryTier::<String, i32>::builder()
///     .max_capacity(1000)
///     .time_to_live(Duration::from_secs(300))
///     .initial_capacity(100)
///     .name("collections")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryTierBuilder<K, V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
    pub(crate) honor_entry_ttl: bool,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> Default for InMemoryTierBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryTierBuilder<K, V> {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            time_to_idle: None,
            name: None,
            honor_entry_ttl: true,
            _phantom: PhantomData,
        }
    }

    /// Caps the number of entries. Beyond it, entries are evicted by `TinyLFU`.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Pre-allocation hint.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Expires every entry this long after it was written, independent of its own TTL.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Expires entries that were neither read nor written for this long.
    #[must_use]
    pub fn time_to_idle(mut self, duration: Duration) -> Self {
        self.time_to_idle = Some(duration);
        self
    }

    /// Names the tier in moka's diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether entries expire after their own [`CacheEntry::ttl`](hoard_tier::CacheEntry::ttl).
    ///
    /// Enabled by default.
    #[must_use]
    pub fn honor_entry_ttl(mut self, honor: bool) -> Self {
        self.honor_entry_ttl = honor;
        self
    }
}

impl<K, V> InMemoryTierBuilder<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds the tier.
    #[must_use]
    pub fn build(self) -> InMemoryTier<K, V> {
        InMemoryTier::from_builder(&self)
    }
}
