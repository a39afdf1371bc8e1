// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process tier backed by moka.
//!
//! [`InMemoryTier`] is a concurrent map with `TinyLFU` eviction. Entries expire after the TTL
//! carried by their [`CacheEntry`](hoard_tier::CacheEntry), after the tier-wide time-to-live or
//! time-to-idle configured on [`InMemoryTierBuilder`], whichever comes first.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use hoard_memory::InMemoryTier;
//! use hoard_tier::{CacheEntry, CacheTier};
//!
//! let tier = InMemoryTier::<String, i32>::builder()
//!     .max_capacity(1000)
//!     .time_to_live(Duration::from_secs(300))
//!     .build();
//!
//! tier.insert(&"key".to_string(), CacheEntry::new(42))?;
//! let value = tier.get(&"key".to_string())?;
//! assert_eq!(value.map(|entry| entry.into_value()), Some(42));
//! # Ok::<(), hoard_tier::Error>(())
//! ```

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::InMemoryTierBuilder;
#[doc(inline)]
pub use tier::InMemoryTier;
