// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Extension traits for telemetry recording.

use std::time::Duration;

use tick::Clock;

use crate::telemetry::{Activity, CollectionTelemetry, TierOperation};

/// Result of a timed operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedResult<R> {
    pub result: R,
    pub duration: Duration,
}

pub(crate) trait ClockExt {
    /// Runs `f` and returns its result with the elapsed monotonic time.
    fn timed<R>(&self, f: impl FnOnce() -> R) -> TimedResult<R>;
}

impl ClockExt for Clock {
    fn timed<R>(&self, f: impl FnOnce() -> R) -> TimedResult<R> {
        let start = self.instant();
        let result = f();
        TimedResult {
            result,
            duration: self.instant().saturating_duration_since(start),
        }
    }
}

pub(crate) trait TelemetryExt {
    /// Records an activity if telemetry is configured.
    fn record(&self, name: &str, operation: TierOperation, activity: Activity, duration: Duration);
}

impl TelemetryExt for Option<CollectionTelemetry> {
    fn record(&self, name: &str, operation: TierOperation, activity: Activity, duration: Duration) {
        if let Some(t) = self {
            t.record(name, operation, activity, Some(duration));
        }
    }
}

#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;
    use crate::testing::LogCapture;

    #[test]
    fn timed_measures_clock_time() {
        let control = ClockControl::new();
        let clock = control.to_clock();

        let timed = clock.timed(|| {
            control.advance(Duration::from_millis(100));
            42
        });

        assert_eq!(timed.result, 42);
        assert_eq!(timed.duration, Duration::from_millis(100));
    }

    #[test]
    fn none_emits_nothing() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let telemetry: Option<CollectionTelemetry> = None;
        telemetry.record("memory", TierOperation::Get, Activity::Hit, Duration::from_millis(1));

        assert!(capture.output().is_empty());
    }

    #[test]
    fn some_forwards() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let telemetry = Some(CollectionTelemetry::new(true));
        telemetry.record("shared", TierOperation::Insert, Activity::Inserted, Duration::from_millis(1));

        capture.assert_contains("tier.inserted");
    }
}
