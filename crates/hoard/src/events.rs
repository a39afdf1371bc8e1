// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lifecycle notifications.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// What happened to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum EventKind {
    /// The key was registered.
    Registered,
    /// A payload was read from a tier.
    Loaded,
    /// Produced items went through the transform pipeline.
    Curated,
    /// A refreshed payload was stored in a persistent or shared tier.
    Saved,
    /// A refresh completed.
    Refreshed,
    /// A refresh failed and the previous payload was kept.
    NotRefreshed,
    /// The payload was voided.
    Expired,
    /// Tier records were removed while the in-process payload was kept.
    Cleared,
    /// The producer yields the same items as another registered producer.
    FoundDuplicate,
}

impl EventKind {
    /// Returns the snake-case name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Loaded => "loaded",
            Self::Curated => "curated",
            Self::Saved => "saved",
            Self::Refreshed => "refreshed",
            Self::NotRefreshed => "not_refreshed",
            Self::Expired => "expired",
            Self::Cleared => "cleared",
            Self::FoundDuplicate => "found_duplicate",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification about one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    key: String,
    duplicate_of: Option<String>,
}

impl Event {
    pub(crate) fn new(kind: EventKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            duplicate_of: None,
        }
    }

    pub(crate) fn duplicate(key: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            kind: EventKind::FoundDuplicate,
            key: key.into(),
            duplicate_of: Some(original.into()),
        }
    }

    /// Returns what happened.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the collection key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// For [`EventKind::FoundDuplicate`], the key of the collection with the same items.
    #[must_use]
    pub fn duplicate_of(&self) -> Option<&str> {
        self.duplicate_of.as_deref()
    }

    /// Returns the qualified name, `collection:{key}/{kind}`.
    ///
    /// ```
    /// # use hoard::{EventKind, RecordingBus, Registry, Producer};
    /// # use tick::ClockControl;
    /// let bus = RecordingBus::new();
    /// let registry = Registry::builder(ClockControl::new().to_clock()).events(bus.clone()).build();
    /// registry.register("nums", Producer::new(|| [1, 2]), -1);
    /// assert_eq!(bus.events()[0].name(), "collection:nums/registered");
    /// ```
    #[must_use]
    pub fn name(&self) -> String {
        format!("collection:{}/{}", self.key, self.kind)
    }
}

/// Receives events. Publishing is fire-and-forget.
///
/// Any `Fn(&Event)` closure is a bus:
///
/// ```
/// use hoard::{Event, Registry};
/// use tick::ClockControl;
///
/// let registry = Registry::builder(ClockControl::new().to_clock())
///     .events(|event: &Event| println!("{}", event.name()))
///     .build();
/// # let _ = registry;
/// ```
pub trait EventBus: Send + Sync {
    /// Handles one event.
    fn publish(&self, event: &Event);
}

impl<F> EventBus for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn publish(&self, event: &Event) {
        self(event);
    }
}

/// A bus that keeps every event for later inspection.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingBus {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events published so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Counts events of `kind` for `key`.
    #[must_use]
    pub fn count(&self, kind: EventKind, key: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind == kind && event.key == key)
            .count()
    }

    /// Returns the kinds published for `key`, in order.
    #[must_use]
    pub fn kinds_for(&self, key: &str) -> Vec<EventKind> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.key == key)
            .map(Event::kind)
            .collect()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn names() {
        assert_eq!(Event::new(EventKind::NotRefreshed, "posts").name(), "collection:posts/not_refreshed");
        assert_eq!(EventKind::FoundDuplicate.to_string(), "found_duplicate");

        let duplicate = Event::duplicate("dup", "orig");
        assert_eq!(duplicate.kind(), EventKind::FoundDuplicate);
        assert_eq!(duplicate.duplicate_of(), Some("orig"));
        assert_eq!(Event::new(EventKind::Saved, "k").duplicate_of(), None);
    }

    #[test]
    fn recording_bus_filters() {
        let bus = RecordingBus::new();
        bus.publish(&Event::new(EventKind::Registered, "a"));
        bus.publish(&Event::new(EventKind::Refreshed, "a"));
        bus.publish(&Event::new(EventKind::Refreshed, "b"));

        assert_eq!(bus.count(EventKind::Refreshed, "a"), 1);
        assert_eq!(bus.kinds_for("a"), [EventKind::Registered, EventKind::Refreshed]);
        assert_eq!(bus.clone().events().len(), 3);

        bus.clear();
        assert!(bus.events().is_empty());
    }

    #[test]
    fn closures_are_buses() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let bus: Box<dyn EventBus> = Box::new(move |_: &Event| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        bus.publish(&Event::new(EventKind::Expired, "k"));
        bus.publish(&Event::new(EventKind::Cleared, "k"));
        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }
}
