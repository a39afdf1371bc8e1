// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for storage backends.

use std::sync::Arc;

use crate::{CacheEntry, Error};

/// A storage tier.
///
/// Tiers are synchronous: a lookup either finds an entry, reports a miss with `Ok(None)`, or
/// fails. The time-to-live of an inserted value travels on the [`CacheEntry`]; tiers that can
/// expire data natively should honor [`CacheEntry::ttl`], tiers that cannot may ignore it since
/// callers re-check expiry on read.
///
/// All four core methods are required. `len` and `is_empty` default to `None` because not every
/// backend can count its entries cheaply.
pub trait CacheTier<K, V>: Send + Sync {
    /// Gets an entry, returning `Ok(None)` on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not be read.
    fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error>;

    /// Inserts or replaces an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejected the write.
    fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error>;

    /// Removes an entry. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not be written.
    fn invalidate(&self, key: &K) -> Result<(), Error>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not be written.
    fn clear(&self) -> Result<(), Error>;

    /// Returns the number of entries, if supported.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the tier holds no entries, if supported.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}

impl<K, V, T> CacheTier<K, V> for Arc<T>
where
    T: CacheTier<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        (**self).get(key)
    }

    fn insert(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        (**self).insert(key, entry)
    }

    fn invalidate(&self, key: &K) -> Result<(), Error> {
        (**self).invalidate(key)
    }

    fn clear(&self) -> Result<(), Error> {
        (**self).clear()
    }

    fn len(&self) -> Option<u64> {
        (**self).len()
    }

    fn is_empty(&self) -> Option<bool> {
        (**self).is_empty()
    }
}
