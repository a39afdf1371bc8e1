// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The moka-backed tier.

use std::{
    hash::Hash,
    sync::Arc,
    time::{Duration, Instant},
};

use hoard_tier::{CacheEntry, CacheTier, Error};
use moka::{Expiry, sync::Cache};

use crate::builder::InMemoryTierBuilder;

/// An in-process tier backed by moka.
///
/// Clones share the same storage.
///
/// # Examples
///
/// ```
/// use hoard_memory::InMemoryTier;
/// use hoard_tier::{CacheEntry, CacheTier};
///
/// let tier = InMemoryTier::<String, i32>::new();
/// tier.insert(&"key".to_string(), CacheEntry::new(42))?;
/// assert!(tier.get(&"key".to_string())?.is_some());
/// # Ok::<(), hoard_tier::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Cache<K, CacheEntry<V>>>,
}

/// Hands each entry's own TTL to moka.
struct EntryTtl;

impl<K, V> Expiry<K, CacheEntry<V>> for EntryTtl {
    fn expire_after_create(&self, _key: &K, value: &CacheEntry<V>, _created_at: Instant) -> Option<Duration> {
        value.ttl()
    }

    fn expire_after_update(
        &self,
        _key: &K,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl()
    }
}

impl<K, V> Default for InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded tier that honors per-entry TTLs.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a tier holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a builder.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use hoard_memory::InMemoryTier;
    ///
    /// let tier = InMemoryTier::<String, i32>::builder()
    ///     .max_capacity(1000)
    ///     .time_to_idle(Duration::from_secs(60))
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> InMemoryTierBuilder<K, V> {
        InMemoryTierBuilder::new()
    }

    pub(crate) fn from_builder(builder: &InMemoryTierBuilder<K, V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(tti) = builder.time_to_idle {
            moka_builder = moka_builder.time_to_idle(tti);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        if builder.honor_entry_ttl {
            moka_builder = moka_builder.expire_after(EntryTtl);
        }

        Self {
            inner: Arc::new(moka_builder.build()),
        }
    }
}

impl<K, V> CacheTier<K, V> for InMemoryTier<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        Ok(self.inner.get(key))
    }

    fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        self.inner.insert(key.clone(), entry);
        Ok(())
    }

    fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.inner.invalidate(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.inner.invalidate_all();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        // moka counts lazily; flush pending bookkeeping so the figure is current.
        self.inner.run_pending_tasks();
        Some(self.inner.entry_count())
    }
}
