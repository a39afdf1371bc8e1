// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Metrics recorded for tier operations and producer runs.

use hoard::{CollectionTelemetry, Producer, Registry};
use opentelemetry_sdk::metrics::data::ResourceMetrics;
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};
use tick::ClockControl;

fn metric_names(exporter: &InMemoryMetricExporter) -> Vec<String> {
    exporter
        .get_finished_metrics()
        .unwrap()
        .iter()
        .flat_map(ResourceMetrics::scope_metrics)
        .flat_map(|scope| scope.metrics())
        .map(|metric| metric.name().to_string())
        .collect()
}

#[test]
fn producer_runs_and_tier_calls_are_counted() {
    let exporter = InMemoryMetricExporter::default();
    let provider = SdkMeterProvider::builder().with_periodic_exporter(exporter.clone()).build();

    let registry = Registry::builder(ClockControl::new().to_clock())
        .telemetry(CollectionTelemetry::with_meter_provider(false, &provider))
        .build();
    registry.register("nums", Producer::new(|| [1, 2]), -1).items();

    provider.force_flush().unwrap();
    let names = metric_names(&exporter);
    assert!(names.iter().any(|name| name == "hoard.event.count"), "{names:?}");
    assert!(names.iter().any(|name| name == "hoard.operation.duration"), "{names:?}");
}
