// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Named, lazily-populated collections cached across memory, persistent and shared tiers.
//!
//! A [`Registry`] maps keys to [`Producer`]s. Reading a [`Collection`] for the first time
//! resolves its payload from the first tier holding a fresh record, or runs the producer and
//! writes the result back. How long a payload stays valid is its [`Life`]:
//!
//! | Life        | Seconds | Memory | Persistent | Shared |
//! |-------------|---------|--------|------------|--------|
//! | `Runtime`   | `-1`    | yes    | no         | no     |
//! | `Forever`   | `0`     | yes    | yes        | no     |
//! | `Expires`   | `n > 0` | yes    | yes        | yes    |
//!
//! Tiers are consulted in the fixed order Memory, Persistent, Shared. A hit from a lower tier
//! is promoted into the tiers above it according to the [`PromotionPolicy`].
//!
//! Reads never fail: producer failures, malformed records and tier errors are reported through
//! `tracing` and recovered from. Only [`Registry::try_register`] and [`Registry::try_get`]
//! return errors.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use hoard::{EventKind, Producer, RecordingBus, Registry, Source};
//! use hoard_tier::testing::MockTier;
//! use serde_json::json;
//! use tick::ClockControl;
//!
//! let control = ClockControl::new();
//! let disk = MockTier::<String, Vec<u8>>::new();
//! let events = RecordingBus::new();
//!
//! let registry = Registry::builder(control.to_clock())
//!     .persistent(disk.clone())
//!     .events(events.clone())
//!     .build();
//!
//! let mut posts = registry.register("posts", Producer::new(|| ["first", "second"]), 300);
//! assert_eq!(posts.items().to_value(), json!(["first", "second"]));
//! assert_eq!(posts.source(), Source::Runtime);
//! assert_eq!(events.count(EventKind::Saved, "posts"), 1);
//! assert!(disk.contains_key(&hoard::storage_key("posts")));
//!
//! control.advance(Duration::from_secs(301));
//! assert!(posts.has(0));
//! assert_eq!(events.count(EventKind::Expired, "posts"), 1);
//! ```

mod collection;
mod duplicates;
mod equality;
pub mod error;
mod events;
mod instrument;
mod items;
pub mod life;
mod options;
mod producer;
mod record;
mod registry;
mod telemetry;
mod tiers;
mod view;
mod wrapper;

#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use collection::Collection;
#[doc(inline)]
pub use equality::Equality;
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use events::{Event, EventBus, EventKind, RecordingBus};
#[doc(inline)]
pub use hoard_tier::{CacheEntry, CacheTier, DynamicTier, DynamicTierExt};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use hoard_memory::{InMemoryTier, InMemoryTierBuilder};
#[doc(inline)]
pub use instrument::{AccessRecord, Instrumentation};
#[doc(inline)]
pub use items::{ItemKey, Items, Lookup, NotASequence};
#[doc(inline)]
pub use life::Life;
#[doc(inline)]
pub use options::DebugOptions;
#[doc(inline)]
pub use producer::{Producer, Registration};
#[doc(inline)]
pub use record::{EncodedTier, Record, Source, storage_key};
#[doc(inline)]
pub use registry::{Registry, RegistryBuilder};
#[doc(inline)]
pub use telemetry::CollectionTelemetry;
#[doc(inline)]
pub use tiers::{PromotionPolicy, TierKind};
#[doc(inline)]
pub use view::{Cursor, ItemsView};
