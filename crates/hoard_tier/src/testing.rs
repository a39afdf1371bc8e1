// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A recording tier double for tests.
//!
//! [`MockTier`] stores entries in a shared map, records every operation, can be told to fail
//! selected operations, and optionally honors per-entry TTLs against a [`tick::Clock`].

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;
use tick::Clock;

use crate::{CacheEntry, CacheTier, Error};

/// An operation observed by a [`MockTier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOp<K, V> {
    /// A lookup for the key.
    Get(K),
    /// A write of the entry under the key.
    Insert {
        /// The key written.
        key: K,
        /// The entry written.
        entry: CacheEntry<V>,
    },
    /// A removal of the key.
    Invalidate(K),
    /// A removal of every key.
    Clear,
}

impl<K, V> TierOp<K, V> {
    /// Returns `true` for [`TierOp::Insert`].
    #[must_use]
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }

    /// Returns `true` for [`TierOp::Get`].
    #[must_use]
    pub fn is_get(&self) -> bool {
        matches!(self, Self::Get(_))
    }
}

type FailPredicate<K, V> = Box<dyn Fn(&TierOp<K, V>) -> bool + Send + Sync>;

/// A configurable tier double.
///
/// Clones share storage, the operation log and the failure predicate, so one clone can be
/// handed to the code under test while another is kept for assertions. Two registries that
/// receive clones of the same `MockTier` see the same data, which is how tests simulate two
/// processes sharing a persistent store.
///
/// # Examples
///
/// ```
/// use hoard_tier::testing::{MockTier, TierOp};
/// use hoard_tier::{CacheEntry, CacheTier};
///
/// let tier = MockTier::<String, i32>::new();
/// tier.insert(&"key".to_string(), CacheEntry::new(42))?;
/// let value = tier.get(&"key".to_string())?;
/// assert_eq!(value.map(|e| e.into_value()), Some(42));
///
/// tier.fail_when(|op| matches!(op, TierOp::Get(_)));
/// assert!(tier.get(&"key".to_string()).is_err());
/// # Ok::<(), hoard_tier::Error>(())
/// ```
pub struct MockTier<K, V> {
    data: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    operations: Arc<Mutex<Vec<TierOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
    clock: Option<Clock>,
}

impl<K, V> std::fmt::Debug for MockTier<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

impl<K, V> Clone for MockTier<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            clock: self.clock.clone(),
        }
    }
}

impl<K, V> Default for MockTier<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockTier<K, V> {
    /// Creates an empty tier that keeps entries until they are invalidated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            clock: None,
        }
    }

    /// Makes the tier drop entries whose TTL has elapsed on `clock`, like a real TTL-aware store.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<K, V> MockTier<K, V>
where
    K: Eq + Hash,
{
    /// Returns the number of stored entries, expired or not.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns `true` if an entry is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockTier<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Returns the stored entry without recording an operation.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        self.data.lock().get(key).cloned()
    }
}

impl<K, V> MockTier<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Makes every operation for which `predicate` returns `true` fail.
    ///
    /// Failed operations are still recorded.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Removes the failure predicate.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns every recorded operation.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Returns the recorded writes.
    #[must_use]
    pub fn inserts(&self) -> Vec<(K, CacheEntry<V>)> {
        self.operations
            .lock()
            .iter()
            .filter_map(|op| match op {
                TierOp::Insert { key, entry } => Some((key.clone(), entry.clone())),
                _ => None,
            })
            .collect()
    }

    /// Forgets the recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: TierOp<K, V>) -> bool {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        fail
    }
}

impl<K, V> CacheTier<K, V> for MockTier<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        if self.record(TierOp::Get(key.clone())) {
            return Err(Error::from_message("mock: get failed"));
        }

        let mut data = self.data.lock();
        let expired = match (&self.clock, data.get(key)) {
            (Some(clock), Some(entry)) => entry.is_expired_at(clock.system_time()),
            _ => false,
        };
        if expired {
            data.remove(key);
            return Ok(None);
        }

        Ok(data.get(key).cloned())
    }

    fn insert(&self, key: &K, mut entry: CacheEntry<V>) -> Result<(), Error> {
        if let Some(clock) = &self.clock {
            entry.ensure_cached_at(clock.system_time());
        }

        if self.record(TierOp::Insert {
            key: key.clone(),
            entry: entry.clone(),
        }) {
            return Err(Error::from_message("mock: insert failed"));
        }

        self.data.lock().insert(key.clone(), entry);
        Ok(())
    }

    fn invalidate(&self, key: &K) -> Result<(), Error> {
        if self.record(TierOp::Invalidate(key.clone())) {
            return Err(Error::from_message("mock: invalidate failed"));
        }

        self.data.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        if self.record(TierOp::Clear) {
            return Err(Error::from_message("mock: clear failed"));
        }

        self.data.lock().clear();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}
