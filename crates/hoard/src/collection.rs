// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A handle to one named collection and its resolved payload.

use std::collections::VecDeque;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::instrument::{AccessRecord, Instrumentation};
use crate::items::Lookup;
use crate::registry::{Context, Definition};
use crate::{Equality, Event, EventKind, Items, ItemsView, Life, Record, Source, life};

static EMPTY: Items = Items::new();

#[derive(Debug, Clone, Default)]
struct State {
    items: Option<Arc<Items>>,
    created_at: Option<SystemTime>,
    expires_at: Option<SystemTime>,
    source: Source,
}

/// A handle to a registered collection.
///
/// The payload is resolved lazily on the first read: from the first tier holding a fresh record,
/// otherwise by running the producer. Once resolved, reads return the same payload until
/// [`refresh`](Self::refresh) or [`expire`](Self::expire) is called or the payload's life runs
/// out.
///
/// Reads never fail. A producer that fails or returns something other than a sequence is
/// reported and the previous payload, or an empty one, is served instead.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use hoard::{Producer, Registry};
/// use tick::ClockControl;
///
/// let control = ClockControl::new();
/// let registry = Registry::builder(control.to_clock()).build();
/// let mut tags = registry.register("tags", Producer::new(|| ["rust", "cache"]), 60);
///
/// assert!(tags.contains(&"rust".into()));
/// let first = tags.created_at();
///
/// control.advance(Duration::from_secs(61));
/// assert!(tags.has(1));
/// assert_ne!(tags.created_at(), first);
/// ```
pub struct Collection {
    definition: Arc<Definition>,
    context: Arc<Context>,
    registered: bool,
    state: State,
    access_log: Option<VecDeque<AccessRecord>>,
}

impl Collection {
    /// The number of reads kept in the access log. Older reads are dropped first.
    pub const ACCESS_LOG_CAPACITY: usize = 256;

    pub(crate) fn new(definition: Arc<Definition>, context: Arc<Context>, registered: bool) -> Self {
        let logging = context.options.access_log || definition.debug();
        Self {
            definition,
            context,
            registered,
            state: State::default(),
            access_log: logging.then(VecDeque::new),
        }
    }

    /// Returns the collection key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.definition.key
    }

    /// Returns how long produced payloads stay valid.
    #[must_use]
    pub fn life(&self) -> Life {
        self.definition.life()
    }

    /// Returns where the current payload came from.
    #[must_use]
    pub fn source(&self) -> Source {
        self.state.source
    }

    /// Returns when the current payload was produced, if one was ever resolved.
    #[must_use]
    pub fn created_at(&self) -> Option<SystemTime> {
        self.state.created_at
    }

    /// Returns when the current payload stops being valid. Only expiring lives have one.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.state.expires_at
    }

    /// Returns `false` for the empty handle handed out for an unknown key.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Returns `true` once a payload is held.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.state.items.is_some()
    }

    /// Returns `true` if both handles refer to the same registration.
    #[must_use]
    pub fn is_same_entry(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.definition, &other.definition)
    }

    /// Returns the most recent reads recorded on this handle, oldest first.
    ///
    /// Empty unless access logging is enabled. At most [`ACCESS_LOG_CAPACITY`](Self::ACCESS_LOG_CAPACITY)
    /// reads are kept.
    pub fn access_log(&self) -> impl ExactSizeIterator<Item = &AccessRecord> {
        self.access_log.as_ref().map(VecDeque::iter).unwrap_or_default()
    }

    /// Returns the debug hooks of the collection.
    #[must_use]
    pub fn instrumentation(&self) -> &Instrumentation {
        &self.definition.instrumentation
    }

    /// Returns the current payload in its stored form, if one is held.
    #[must_use]
    pub fn record(&self) -> Option<Record> {
        let items = self.state.items.as_deref()?;
        Some(Record {
            created_at: self.state.created_at?,
            expires_at: self.state.expires_at,
            items: items.clone(),
            source: self.state.source,
        })
    }

    /// Returns `true` if the life expires and the deadline is missing or past.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        life::has_expired(self.life(), self.state.expires_at, self.context.now())
    }

    /// Returns the items, resolving them first if needed.
    #[track_caller]
    pub fn items(&mut self) -> &Items {
        self.note_access("items", Location::caller());
        self.resolve()
    }

    /// Returns an immutable snapshot of the items for iteration.
    #[track_caller]
    pub fn view(&mut self) -> ItemsView {
        self.note_access("view", Location::caller());
        self.resolve();
        ItemsView::new(self.state.items.clone().unwrap_or_default())
    }

    /// Returns `true` if `key` holds a non-null item.
    ///
    /// Keys that are neither strings nor integers are never present.
    #[track_caller]
    pub fn has(&mut self, key: impl Into<Lookup>) -> bool {
        self.note_access("has", Location::caller());
        self.resolve().has(key)
    }

    /// Returns `true` if an item is strictly equal to `value`.
    #[track_caller]
    pub fn contains(&mut self, value: &Value) -> bool {
        self.note_access("contains", Location::caller());
        self.resolve().contains(value, Equality::Strict)
    }

    /// Returns `true` if an item equals `value` under `equality`.
    #[track_caller]
    pub fn contains_with(&mut self, value: &Value, equality: Equality) -> bool {
        self.note_access("contains", Location::caller());
        self.resolve().contains(value, equality)
    }

    /// Returns the item under `key`, or `None` when [`has`](Self::has) would be `false`.
    #[track_caller]
    pub fn get_item(&mut self, key: impl Into<Lookup>) -> Option<&Value> {
        self.note_access("get_item", Location::caller());
        self.resolve().get(key).filter(|value| !value.is_null())
    }

    /// Returns the number of items.
    #[track_caller]
    pub fn len(&mut self) -> usize {
        self.note_access("len", Location::caller());
        self.resolve().len()
    }

    /// Returns `true` if there are no items.
    #[track_caller]
    pub fn is_empty(&mut self) -> bool {
        self.note_access("len", Location::caller());
        self.resolve().is_empty()
    }

    /// Runs the producer and replaces the payload.
    ///
    /// On failure the previous payload is kept and the failure is reported.
    pub fn refresh(&mut self) -> &mut Self {
        let items = match self.definition.produce(&self.context) {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!(collection.key = self.key(), error = %error, "refresh failed, keeping the previous payload");
                self.publish(EventKind::NotRefreshed);
                return self;
            }
        };
        self.publish(EventKind::Curated);

        let now = self.context.now();
        let created_at = match self.state.created_at {
            Some(previous) if now <= previous => previous.checked_add(Duration::from_nanos(1)).unwrap_or(previous),
            _ => now,
        };
        let life = self.life();

        self.state = State {
            items: Some(Arc::new(items)),
            created_at: Some(created_at),
            expires_at: life::expires_at(created_at, life),
            source: Source::Runtime,
        };

        if self.registered
            && let Some(record) = self.record()
            && self.context.tiers.write_back(self.key(), &record, life, now, self.instrumentation())
        {
            self.publish(EventKind::Saved);
        }

        tracing::debug!(collection.key = self.key(), "collection refreshed");
        self.publish(EventKind::Refreshed);
        self
    }

    /// Voids the payload here and in every tier.
    ///
    /// The next read runs the producer again.
    pub fn expire(&mut self) -> &mut Self {
        self.state.items = None;
        self.state.expires_at = None;

        if self.registered {
            self.context.tiers.invalidate(self.key());
        }

        tracing::debug!(collection.key = self.key(), "collection expired");
        self.publish(EventKind::Expired);
        self
    }

    /// Removes the stored records from every tier while keeping the payload of this handle.
    pub fn clear(&mut self) -> &mut Self {
        if self.registered {
            self.context.tiers.invalidate(self.key());
        }

        self.publish(EventKind::Cleared);
        self
    }

    pub(crate) fn note_access(&mut self, operation: &'static str, location: &'static Location<'static>) {
        if let Some(log) = &mut self.access_log {
            if log.len() == Self::ACCESS_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(AccessRecord::new(self.context.now(), operation, location));
        }
    }

    fn resolve(&mut self) -> &Items {
        if self.state.items.is_none() && self.registered {
            self.load();
        }

        if self.state.items.is_some() && self.has_expired() {
            self.expire();
        }

        if self.state.items.is_none() {
            self.refresh();
        }

        self.state.items.as_deref().unwrap_or(&EMPTY)
    }

    fn load(&mut self) {
        let Some((kind, record)) = self.context.tiers.lookup(self.key(), self.life(), self.context.now(), self.instrumentation()) else {
            return;
        };

        self.state = State {
            items: Some(Arc::new(record.items)),
            created_at: Some(record.created_at),
            expires_at: record.expires_at,
            source: kind.source(),
        };

        tracing::debug!(collection.key = self.key(), tier.name = kind.as_str(), "collection loaded");
        self.publish(EventKind::Loaded);
    }

    fn publish(&self, kind: EventKind) {
        if self.registered {
            self.context.publish(&Event::new(kind, self.key()));
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("key", &self.key())
            .field("life", &self.life())
            .field("registered", &self.registered)
            .field("source", &self.state.source)
            .field("created_at", &self.state.created_at)
            .field("expires_at", &self.state.expires_at)
            .field("len", &self.state.items.as_ref().map(|items| items.len()))
            .finish_non_exhaustive()
    }
}
