// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Debug timers, messages and the access log.

use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use tick::Clock;

#[derive(Debug, Clone, Copy)]
struct Timer {
    started: Instant,
    last_lap: Instant,
}

/// Debug hooks scoped to one collection.
///
/// Every hook is a no-op unless instrumentation is enabled for the collection, either through
/// its registration's `debug` flag or through [`DebugOptions::instrument`](crate::DebugOptions).
/// Output goes to `tracing` at debug level.
#[derive(Debug)]
pub struct Instrumentation {
    scope: String,
    enabled: bool,
    clock: Clock,
    timers: Mutex<HashMap<String, Timer>>,
}

impl Instrumentation {
    pub(crate) fn new(scope: impl Into<String>, enabled: bool, clock: Clock) -> Self {
        Self {
            scope: scope.into(),
            enabled,
            clock,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the hooks emit anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a message for the collection.
    pub fn log(&self, message: impl fmt::Display) {
        if self.enabled {
            tracing::debug!(collection.key = %self.scope, "{message}");
        }
    }

    /// Starts (or restarts) the timer `id`.
    pub fn start(&self, id: &str) {
        if !self.enabled {
            return;
        }

        let now = self.clock.instant();
        self.timers.lock().insert(
            id.to_owned(),
            Timer {
                started: now,
                last_lap: now,
            },
        );
        tracing::debug!(collection.key = %self.scope, hoard.timer.id = id, "timer started");
    }

    /// Returns the time since the previous lap (or the start) of timer `id` and logs it as `label`.
    ///
    /// `None` when disabled or when the timer is not running.
    pub fn lap(&self, id: &str, label: &str) -> Option<Duration> {
        if !self.enabled {
            return None;
        }

        let now = self.clock.instant();
        let mut timers = self.timers.lock();
        let timer = timers.get_mut(id)?;
        let elapsed = now.saturating_duration_since(timer.last_lap);
        timer.last_lap = now;
        drop(timers);

        tracing::debug!(
            collection.key = %self.scope,
            hoard.timer.id = id,
            hoard.timer.lap = label,
            hoard.timer.elapsed = ?elapsed,
            "timer lap"
        );
        Some(elapsed)
    }

    /// Stops timer `id` and returns its total running time.
    ///
    /// `None` when disabled or when the timer is not running.
    pub fn stop(&self, id: &str) -> Option<Duration> {
        if !self.enabled {
            return None;
        }

        let timer = self.timers.lock().remove(id)?;
        let total = self.clock.instant().saturating_duration_since(timer.started);
        tracing::debug!(
            collection.key = %self.scope,
            hoard.timer.id = id,
            hoard.timer.elapsed = ?total,
            "timer stopped"
        );
        Some(total)
    }
}

/// One read of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    at: SystemTime,
    operation: &'static str,
    location: &'static Location<'static>,
}

impl AccessRecord {
    pub(crate) fn new(at: SystemTime, operation: &'static str, location: &'static Location<'static>) -> Self {
        Self { at, operation, location }
    }

    /// When the read happened.
    #[must_use]
    pub fn at(&self) -> SystemTime {
        self.at
    }

    /// The accessor that was called, such as `items` or `has`.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The caller's source location.
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.operation, self.location)
    }
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;
    use crate::testing::LogCapture;

    #[test]
    fn disabled_hooks_do_nothing() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let hooks = Instrumentation::new("k", false, ClockControl::new().to_clock());
        hooks.log("hello");
        hooks.start("t");
        assert_eq!(hooks.lap("t", "a"), None);
        assert_eq!(hooks.stop("t"), None);
        assert!(!hooks.is_enabled());
        assert!(capture.output().is_empty());
    }

    #[test]
    fn laps_and_totals_follow_the_clock() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let control = ClockControl::new();
        let hooks = Instrumentation::new("nums", true, control.to_clock());

        hooks.start("collection:nums/produce/1");
        control.advance(Duration::from_millis(30));
        assert_eq!(hooks.lap("collection:nums/produce/1", "produced"), Some(Duration::from_millis(30)));
        control.advance(Duration::from_millis(5));
        assert_eq!(hooks.lap("collection:nums/produce/1", "curated"), Some(Duration::from_millis(5)));
        assert_eq!(hooks.stop("collection:nums/produce/1"), Some(Duration::from_millis(35)));
        assert_eq!(hooks.stop("collection:nums/produce/1"), None);
        hooks.log("done");

        capture.assert_contains("hoard.timer.id");
        capture.assert_contains("produced");
        capture.assert_contains("done");
    }

    #[test]
    fn unknown_timers() {
        let hooks = Instrumentation::new("k", true, ClockControl::new().to_clock());
        assert_eq!(hooks.lap("missing", "x"), None);
        assert_eq!(hooks.stop("missing"), None);
    }

    #[test]
    fn access_records_display_the_caller() {
        let record = AccessRecord::new(SystemTime::UNIX_EPOCH, "items", Location::caller());
        assert_eq!(record.operation(), "items");
        assert_eq!(record.at(), SystemTime::UNIX_EPOCH);
        assert!(record.to_string().starts_with("items at "));
    }
}
