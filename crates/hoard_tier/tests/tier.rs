// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `CacheTier` default methods and type erasure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hoard_tier::{CacheEntry, CacheTier, DynamicTier, DynamicTierExt, Error};

/// Implements only the required methods.
struct MapTier {
    data: Mutex<HashMap<String, CacheEntry<Vec<u8>>>>,
}

impl MapTier {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl CacheTier<String, Vec<u8>> for MapTier {
    fn get(&self, key: &String) -> Result<Option<CacheEntry<Vec<u8>>>, Error> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    fn insert(&self, key: &String, entry: CacheEntry<Vec<u8>>) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").insert(key.clone(), entry);
        Ok(())
    }

    fn invalidate(&self, key: &String) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").clear();
        Ok(())
    }
}

static_assertions::assert_impl_all!(DynamicTier<String, Vec<u8>>: Send, Sync, Clone);

#[test]
fn miss_then_hit() {
    let tier = MapTier::new();
    let key = "k".to_string();

    assert!(tier.get(&key).expect("get").is_none());
    tier.insert(&key, CacheEntry::new(b"payload".to_vec())).expect("insert");
    let hit = tier.get(&key).expect("get").expect("entry present");
    assert_eq!(hit.value(), b"payload");
}

#[test]
fn invalidate_missing_key_is_ok() {
    let tier = MapTier::new();
    tier.invalidate(&"absent".to_string()).expect("invalidate");
}

#[test]
fn size_defaults_to_unknown() {
    let tier = MapTier::new();
    assert_eq!(tier.len(), None);
    assert_eq!(tier.is_empty(), None);
}

#[test]
fn dynamic_tier_clones_share_backend() {
    let tier: DynamicTier<String, Vec<u8>> = MapTier::new().into_dynamic();
    let clone = tier.clone();
    let key = "shared".to_string();

    clone.insert(&key, CacheEntry::new(vec![1, 2, 3])).expect("insert");
    assert_eq!(tier.get(&key).expect("get").map(CacheEntry::into_value), Some(vec![1, 2, 3]));

    tier.clear().expect("clear");
    assert!(clone.get(&key).expect("get").is_none());
}

#[test]
fn arc_delegates_to_inner_tier() {
    let tier = Arc::new(MapTier::new());
    let key = "arc".to_string();

    CacheTier::insert(&tier, &key, CacheEntry::new(vec![7])).expect("insert");
    assert!(tier.data.lock().expect("lock poisoned").contains_key(&key));
}
