// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Decorates a tier slot with telemetry, timestamps and entry expiry.

use std::marker::PhantomData;
use std::time::Duration;

use hoard_tier::{CacheEntry, CacheTier};
use tick::Clock;

use crate::TierKind;
use crate::telemetry::ext::{ClockExt, TelemetryExt};
use crate::telemetry::{Activity, CollectionTelemetry, TierOperation};

/// Wraps a tier slot.
///
/// - stamps `cached_at` from the clock on insert;
/// - treats an entry whose `cached_at + ttl` has passed as a miss;
/// - times every call and records it as an activity of the slot.
#[derive(Debug)]
pub(crate) struct TierWrapper<V, S> {
    kind: TierKind,
    inner: S,
    clock: Clock,
    telemetry: Option<CollectionTelemetry>,
    _value: PhantomData<fn() -> V>,
}

impl<V, S> TierWrapper<V, S> {
    pub(crate) fn new(kind: TierKind, inner: S, clock: Clock, telemetry: Option<CollectionTelemetry>) -> Self {
        Self {
            kind,
            inner,
            clock,
            telemetry,
            _value: PhantomData,
        }
    }

    pub(crate) fn kind(&self) -> TierKind {
        self.kind
    }

    fn record(&self, operation: TierOperation, activity: Activity, duration: Duration) {
        self.telemetry.record(self.kind.as_str(), operation, activity, duration);
    }
}

impl<V, S> CacheTier<String, V> for TierWrapper<V, S>
where
    V: Send + Sync,
    S: CacheTier<String, V>,
{
    fn get(&self, key: &String) -> Result<Option<CacheEntry<V>>, hoard_tier::Error> {
        let timed = self.clock.timed(|| self.inner.get(key));
        match timed.result {
            Ok(Some(entry)) if entry.is_expired_at(self.clock.system_time()) => {
                self.record(TierOperation::Get, Activity::Expired, timed.duration);
                Ok(None)
            }
            Ok(Some(entry)) => {
                self.record(TierOperation::Get, Activity::Hit, timed.duration);
                Ok(Some(entry))
            }
            Ok(None) => {
                self.record(TierOperation::Get, Activity::Miss, timed.duration);
                Ok(None)
            }
            Err(e) => {
                self.record(TierOperation::Get, Activity::Error, timed.duration);
                Err(e)
            }
        }
    }

    fn insert(&self, key: &String, mut entry: CacheEntry<V>) -> Result<(), hoard_tier::Error> {
        entry.ensure_cached_at(self.clock.system_time());
        let timed = self.clock.timed(|| self.inner.insert(key, entry));
        let activity = if timed.result.is_ok() { Activity::Inserted } else { Activity::Error };
        self.record(TierOperation::Insert, activity, timed.duration);
        timed.result
    }

    fn invalidate(&self, key: &String) -> Result<(), hoard_tier::Error> {
        let timed = self.clock.timed(|| self.inner.invalidate(key));
        let activity = if timed.result.is_ok() { Activity::Invalidated } else { Activity::Error };
        self.record(TierOperation::Invalidate, activity, timed.duration);
        timed.result
    }

    fn clear(&self) -> Result<(), hoard_tier::Error> {
        let timed = self.clock.timed(|| self.inner.clear());
        let activity = if timed.result.is_ok() { Activity::Invalidated } else { Activity::Error };
        self.record(TierOperation::Invalidate, activity, timed.duration);
        timed.result
    }

    fn len(&self) -> Option<u64> {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use hoard_tier::testing::{MockTier, TierOp};
    use tick::ClockControl;

    use super::*;
    use crate::testing::LogCapture;

    fn wrapped(control: &ClockControl, telemetry: Option<CollectionTelemetry>) -> (MockTier<String, u32>, TierWrapper<u32, MockTier<String, u32>>) {
        let mock = MockTier::new();
        let wrapper = TierWrapper::new(TierKind::Persistent, mock.clone(), control.to_clock(), telemetry);
        (mock, wrapper)
    }

    #[test]
    fn insert_stamps_cached_at() {
        let control = ClockControl::new();
        control.advance(Duration::from_secs(30));
        let (mock, wrapper) = wrapped(&control, None);

        wrapper.insert(&"k".to_string(), CacheEntry::new(1)).unwrap();

        let stored = mock.peek(&"k".to_string()).unwrap();
        assert_eq!(stored.cached_at(), Some(control.to_clock().system_time()));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let control = ClockControl::new();
        let (mock, wrapper) = wrapped(&control, None);
        wrapper
            .insert(&"k".to_string(), CacheEntry::with_ttl(7, Duration::from_secs(5)))
            .unwrap();

        control.advance(Duration::from_secs(5));
        assert_eq!(wrapper.get(&"k".to_string()).unwrap().map(CacheEntry::into_value), Some(7));

        control.advance(Duration::from_secs(1));
        assert!(wrapper.get(&"k".to_string()).unwrap().is_none());
        assert!(mock.contains_key(&"k".to_string()));
    }

    #[test]
    fn errors_pass_through_and_are_recorded() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let control = ClockControl::new();
        let (mock, wrapper) = wrapped(&control, Some(CollectionTelemetry::new(true)));
        mock.fail_when(|op| matches!(op, TierOp::Get(_)));

        wrapper.get(&"k".to_string()).unwrap_err();
        capture.assert_contains("tier.error");
        capture.assert_contains("persistent");
    }

    #[test]
    fn activities_are_logged() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let control = ClockControl::new();
        let (_mock, wrapper) = wrapped(&control, Some(CollectionTelemetry::new(true)));
        let key = "k".to_string();

        assert!(wrapper.get(&key).unwrap().is_none());
        wrapper.insert(&key, CacheEntry::new(1)).unwrap();
        assert!(wrapper.get(&key).unwrap().is_some());
        wrapper.invalidate(&key).unwrap();
        wrapper.clear().unwrap();

        for activity in ["tier.miss", "tier.inserted", "tier.hit", "tier.invalidated"] {
            capture.assert_contains(activity);
        }
        assert_eq!(wrapper.kind(), TierKind::Persistent);
        assert_eq!(wrapper.len(), Some(0));
    }
}
