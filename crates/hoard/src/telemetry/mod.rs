// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tier and producer telemetry.
//!
//! Every tier call and producer run is recorded as an activity. Activities are logged through
//! `tracing` when logging is enabled and, with the `metrics` feature, counted and timed through
//! OpenTelemetry instruments.

use std::sync::Arc;
use std::time::Duration;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Histogram, Meter, MeterProvider},
};
use tracing::Level;

pub(crate) mod attributes;
pub(crate) mod ext;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

/// Telemetry sink shared by every tier slot and collection of a registry.
///
/// Pass it to [`RegistryBuilder::telemetry`](crate::RegistryBuilder::telemetry).
///
/// ```
/// use hoard::{CollectionTelemetry, Registry};
/// use tick::ClockControl;
///
/// let registry = Registry::builder(ClockControl::new().to_clock())
///     .telemetry(CollectionTelemetry::new(true))
///     .build();
/// # let _ = registry;
/// ```
#[derive(Clone, Debug)]
pub struct CollectionTelemetry {
    inner: Arc<TelemetryInner>,
}

#[derive(Debug)]
struct TelemetryInner {
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    operation_duration: Option<Histogram<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TierOperation {
    Get,
    Insert,
    Invalidate,
    Promote,
    Produce,
}

impl TierOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "tier.get",
            Self::Insert => "tier.insert",
            Self::Invalidate => "tier.invalidate",
            Self::Promote => "tier.promote",
            Self::Produce => "collection.produce",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    Hit,
    Miss,
    Expired,
    Inserted,
    Invalidated,
    Promoted,
    Produced,
    Failed,
    Error,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "tier.hit",
            Self::Miss => "tier.miss",
            Self::Expired => "tier.expired",
            Self::Inserted => "tier.inserted",
            Self::Invalidated => "tier.invalidated",
            Self::Promoted => "tier.promoted",
            Self::Produced => "collection.produced",
            Self::Failed => "collection.failed",
            Self::Error => "tier.error",
        }
    }

    pub fn severity(self) -> Level {
        match self {
            Self::Hit | Self::Miss | Self::Produced => Level::DEBUG,
            Self::Expired | Self::Inserted | Self::Invalidated | Self::Promoted => Level::INFO,
            Self::Failed | Self::Error => Level::WARN,
        }
    }
}

impl CollectionTelemetry {
    /// Creates a telemetry sink that logs activities through `tracing` when `logging_enabled`.
    #[must_use]
    pub fn new(logging_enabled: bool) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                logging_enabled,
                #[cfg(any(feature = "metrics", test))]
                event_counter: None,
                #[cfg(any(feature = "metrics", test))]
                operation_duration: None,
            }),
        }
    }

    /// Creates a telemetry sink that also records metrics on `meter`.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn with_meter(logging_enabled: bool, meter: &Meter) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                logging_enabled,
                event_counter: Some(metrics::create_event_counter(meter)),
                operation_duration: Some(metrics::create_operation_duration_histogram(meter)),
            }),
        }
    }

    /// Creates a telemetry sink that records metrics on the `hoard` meter of `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn with_meter_provider(logging_enabled: bool, provider: &dyn MeterProvider) -> Self {
        Self::with_meter(logging_enabled, &metrics::create_meter(provider))
    }

    /// Returns `true` if activities are logged.
    #[must_use]
    pub fn logging_enabled(&self) -> bool {
        self.inner.logging_enabled
    }

    pub(crate) fn record(&self, name: &str, operation: TierOperation, activity: Activity, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        {
            let attrs = [
                KeyValue::new(attributes::TIER_NAME, name.to_owned()),
                KeyValue::new(attributes::TIER_OPERATION_NAME, operation.as_str()),
                KeyValue::new(attributes::TIER_ACTIVITY_NAME, activity.as_str()),
            ];

            if let Some(c) = &self.inner.event_counter {
                c.add(1, &attrs);
            }

            if let (Some(d), Some(h)) = (duration, &self.inner.operation_duration) {
                h.record(d.as_secs_f64(), &attrs);
            }
        }

        if self.inner.logging_enabled {
            Self::emit(name, operation, activity, duration);
        }
    }

    fn emit(name: &str, operation: TierOperation, activity: Activity, duration: Option<Duration>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());

        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                if operation == TierOperation::Produce {
                    tracing::$level!(
                        collection.key = name,
                        tier.operation = op,
                        tier.activity = act,
                        tier.duration_ns = ?duration_ns,
                        "hoard.activity"
                    )
                } else {
                    tracing::$level!(
                        tier.name = name,
                        tier.operation = op,
                        tier.activity = act,
                        tier.duration_ns = ?duration_ns,
                        "hoard.activity"
                    )
                }
            };
        }

        let level = activity.severity();
        if level == Level::WARN {
            emit_event!(warn);
        } else if level == Level::INFO {
            emit_event!(info);
        } else {
            emit_event!(debug);
        }
    }
}
