// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type-erased tiers.

use std::{fmt::Debug, sync::Arc};

use crate::{CacheEntry, CacheTier, Error};

/// Converts any [`CacheTier`] into a [`DynamicTier`].
///
/// ```
/// use hoard_tier::{CacheTier, DynamicTier, DynamicTierExt};
///
/// fn erase<T>(tier: T) -> DynamicTier<String, Vec<u8>>
/// where
///     T: CacheTier<String, Vec<u8>> + 'static,
/// {
///     tier.into_dynamic()
/// }
/// ```
pub trait DynamicTierExt<K, V>: Sized {
    /// Wraps this tier in a [`DynamicTier`].
    fn into_dynamic(self) -> DynamicTier<K, V>;
}

impl<K, V, T> DynamicTierExt<K, V> for T
where
    T: CacheTier<K, V> + 'static,
{
    fn into_dynamic(self) -> DynamicTier<K, V> {
        DynamicTier::new(self)
    }
}

/// A clonable tier with its concrete type erased.
///
/// Clones share the same underlying tier.
pub struct DynamicTier<K, V>(Arc<dyn CacheTier<K, V>>);

impl<K, V> DynamicTier<K, V> {
    /// Wraps a concrete tier.
    pub fn new<T>(tier: T) -> Self
    where
        T: CacheTier<K, V> + 'static,
    {
        Self(Arc::new(tier))
    }
}

impl<K, V> Debug for DynamicTier<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTier").finish_non_exhaustive()
    }
}

impl<K, V> Clone for DynamicTier<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> CacheTier<K, V> for DynamicTier<K, V> {
    fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        self.0.get(key)
    }

    fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        self.0.insert(key, entry)
    }

    fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.0.invalidate(key)
    }

    fn clear(&self) -> Result<(), Error> {
        self.0.clear()
    }

    fn len(&self) -> Option<u64> {
        self.0.len()
    }

    fn is_empty(&self) -> Option<bool> {
        self.0.is_empty()
    }
}
