// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Storage tier abstractions for `hoard` collections.
//!
//! This crate defines the [`CacheTier`] trait that every storage backend satisfies, along with
//! [`CacheEntry`] for carrying a value together with its timestamp and time-to-live, and the
//! [`Error`] type for fallible tier operations.
//!
//! # Overview
//!
//! A `hoard` registry resolves collections across up to three tiers: an in-process memory
//! tier, a persistent tier and a shared tier. Each of them is just a [`CacheTier`]; the
//! registry layers expiry checks, telemetry and promotion on top.
//!
//! # Implementing a Tier
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! use hoard_tier::{CacheEntry, CacheTier, Error};
//!
//! struct MapTier(RwLock<HashMap<String, CacheEntry<Vec<u8>>>>);
//!
//! impl CacheTier<String, Vec<u8>> for MapTier {
//!     fn get(&self, key: &String) -> Result<Option<CacheEntry<Vec<u8>>>, Error> {
//!         let map = self.0.read().map_err(|e| Error::from_message(e.to_string()))?;
//!         Ok(map.get(key).cloned())
//!     }
//!
//!     fn insert(&self, key: &String, entry: CacheEntry<Vec<u8>>) -> Result<(), Error> {
//!         let mut map = self.0.write().map_err(|e| Error::from_message(e.to_string()))?;
//!         map.insert(key.clone(), entry);
//!         Ok(())
//!     }
//!
//!     fn invalidate(&self, key: &String) -> Result<(), Error> {
//!         let mut map = self.0.write().map_err(|e| Error::from_message(e.to_string()))?;
//!         map.remove(key);
//!         Ok(())
//!     }
//!
//!     fn clear(&self) -> Result<(), Error> {
//!         let mut map = self.0.write().map_err(|e| Error::from_message(e.to_string()))?;
//!         map.clear();
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! [`DynamicTier`] wraps any `CacheTier` in a clonable, type-erased container so tiers with
//! different concrete types can sit side by side in one chain.

mod dynamic;
mod entry;
pub mod error;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;

#[doc(inline)]
pub use dynamic::{DynamicTier, DynamicTierExt};
#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use tier::CacheTier;
