// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The stored form of a collection payload and its JSON encoding.

use std::fmt;
use std::time::SystemTime;

use hoard_tier::{CacheEntry, CacheTier};
use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Items};

const KEY_PREFIX: &str = "collection__";

/// Returns the key a collection is stored under in every tier.
///
/// ```
/// assert_eq!(hoard::storage_key("nums"), "collection__nums");
/// ```
#[must_use]
pub fn storage_key(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

/// Where a collection's current payload came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Computed by the producer in this process.
    #[default]
    Runtime,
    /// Read from the in-process memory tier.
    MemoryTier,
    /// Read from the persistent tier.
    PersistentTier,
    /// Read from the shared tier.
    SharedTier,
}

impl Source {
    /// Returns the serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Runtime => "runtime",
            Self::MemoryTier => "memory_tier",
            Self::PersistentTier => "persistent_tier",
            Self::SharedTier => "shared_tier",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload as written to a tier.
///
/// Serialized as `{created_at, expires_at, items, source}`; `expires_at` is `null` for payloads
/// that do not expire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// When the payload was produced.
    pub created_at: SystemTime,
    /// When the payload stops being valid.
    pub expires_at: Option<SystemTime>,
    /// The payload.
    pub items: Items,
    /// Where the payload came from when it was written.
    pub source: Source,
}

impl Record {
    /// Returns `true` when the record carries a deadline and `now` is past it.
    #[must_use]
    pub fn is_stale(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|deadline| now > deadline)
    }

    /// Encodes the record as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedPayload`] if the payload cannot be serialized.
    pub fn encode(&self, key: &str) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::caused_by(ErrorKind::MalformedPayload, key, e))
    }

    /// Decodes a record written by [`Record::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedPayload`] for corrupted, truncated or foreign data.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::caused_by(ErrorKind::MalformedPayload, key, e))
    }
}

/// Adapts a byte store into a tier of [`Record`]s by encoding them as JSON.
///
/// Timestamps and TTLs on the entry pass through unchanged. A stored value that does not
/// decode is reported as a tier error, which the registry treats as a miss.
///
/// ```
/// use hoard::{EncodedTier, Items, Record, Source};
/// use hoard_tier::testing::MockTier;
/// use hoard_tier::{CacheEntry, CacheTier};
/// use serde_json::json;
///
/// let bytes = MockTier::<String, Vec<u8>>::new();
/// let tier = EncodedTier::new(bytes.clone());
/// let record = Record {
///     created_at: std::time::SystemTime::UNIX_EPOCH,
///     expires_at: None,
///     items: Items::from_value(json!([1, 2, 3]))?,
///     source: Source::Runtime,
/// };
///
/// tier.insert(&"k".to_string(), CacheEntry::new(record.clone()))?;
/// assert_eq!(tier.get(&"k".to_string())?.map(CacheEntry::into_value), Some(record));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct EncodedTier<S> {
    inner: S,
}

impl<S> EncodedTier<S> {
    /// Wraps a byte store.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> CacheTier<String, Record> for EncodedTier<S>
where
    S: CacheTier<String, Vec<u8>>,
{
    fn get(&self, key: &String) -> Result<Option<CacheEntry<Record>>, hoard_tier::Error> {
        let Some(entry) = self.inner.get(key)? else {
            return Ok(None);
        };
        let record = Record::decode(key, entry.value()).map_err(hoard_tier::Error::from_message)?;
        Ok(Some(entry.map(|_| record)))
    }

    fn insert(&self, key: &String, entry: CacheEntry<Record>) -> Result<(), hoard_tier::Error> {
        let bytes = entry.value().encode(key).map_err(hoard_tier::Error::from_message)?;
        self.inner.insert(key, entry.map(|_| bytes))
    }

    fn invalidate(&self, key: &String) -> Result<(), hoard_tier::Error> {
        self.inner.invalidate(key)
    }

    fn clear(&self) -> Result<(), hoard_tier::Error> {
        self.inner.clear()
    }

    fn len(&self) -> Option<u64> {
        self.inner.len()
    }
}
