//! Metrics bootstrap and simple instruments.
//!
//! [`init_metrics_with_endpoint`] installs the global OpenTelemetry meter
//! provider once. Instruments created through [`counter`], [`gauge`] and
//! [`histogram`] keep their own in-memory value and, when metrics are
//! initialized, forward every update to an OpenTelemetry instrument.

pub mod simple;

use std::sync::OnceLock;

use opentelemetry::global;
use opentelemetry::metrics::Meter;
use opentelemetry_sdk::metrics::{ManualReader, SdkMeterProvider};
use opentelemetry_sdk::Resource;

use crate::config::TelemetryConfig;
use crate::errors::{FoundationError, Result};
use crate::integrations::otlp::create_otlp_resource;

pub use simple::{SimpleCounter, SimpleGauge, SimpleHistogram};

/// Meter name used for every foundation instrument.
const METER_NAME: &str = "provide-foundation";

/// Export period for the OTLP periodic reader.
const EXPORT_PERIOD: std::time::Duration = std::time::Duration::from_secs(10);

static METER: OnceLock<Meter> = OnceLock::new();
static PROVIDER: OnceLock<SdkMeterProvider> = OnceLock::new();

/// Initialize the metrics system.
///
/// This should be called once at startup. Subsequent calls are ignored.
/// With an endpoint, export runs on the Tokio runtime, so call this from
/// inside one.
///
/// # Arguments
///
/// * `otel_endpoint` - Optional OTLP endpoint for metrics export
pub fn init_metrics_with_endpoint(otel_endpoint: Option<&str>) {
    let config = TelemetryConfig {
        otlp_endpoint: otel_endpoint.map(str::to_string),
        ..TelemetryConfig::default()
    };
    init_metrics_with_config(&config);
}

/// Initialize the metrics system without OTLP export.
pub fn init_metrics() {
    init_metrics_with_endpoint(None);
}

/// Initialize metrics from telemetry config, honouring `metrics_enabled`
/// and the service resource attributes.
pub fn init_metrics_with_config(config: &TelemetryConfig) {
    METER.get_or_init(|| {
        let resource = create_otlp_resource(config);
        let endpoint = config
            .otlp_endpoint
            .as_deref()
            .filter(|_| config.metrics_enabled);

        let provider = match endpoint {
            Some(endpoint) => match otlp_provider(endpoint, config, resource.clone()) {
                Ok(provider) => {
                    tracing::info!(endpoint, "OTLP metrics exporter configured");
                    provider
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create OTLP exporter, using no-op metrics");
                    manual_provider(resource)
                }
            },
            // Metrics are recorded but not exported
            None => manual_provider(resource),
        };

        global::set_meter_provider(provider.clone());
        let _ = PROVIDER.set(provider);
        global::meter(METER_NAME)
    });
}

/// The foundation meter, if metrics have been initialized.
pub fn meter() -> Option<&'static Meter> {
    METER.get()
}

/// Flush and stop the meter provider.
pub fn shutdown_metrics() -> Result<()> {
    match PROVIDER.get() {
        Some(provider) => provider
            .shutdown()
            .map_err(|e| FoundationError::Telemetry(format!("metrics shutdown failed: {e}"))),
        None => Ok(()),
    }
}

/// Create a counter, attached to OpenTelemetry when metrics are initialized.
pub fn counter(name: &str, description: &str, unit: &str) -> SimpleCounter {
    let otel = meter().map(|m| {
        m.f64_counter(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .init()
    });
    SimpleCounter::new(name, otel)
}

pub fn gauge(name: &str, description: &str, unit: &str) -> SimpleGauge {
    let otel = meter().map(|m| {
        m.f64_gauge(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .init()
    });
    SimpleGauge::new(name, otel)
}

pub fn histogram(name: &str, description: &str, unit: &str) -> SimpleHistogram {
    let otel = meter().map(|m| {
        m.f64_histogram(name.to_string())
            .with_description(description.to_string())
            .with_unit(unit.to_string())
            .init()
    });
    SimpleHistogram::new(name, otel)
}

fn manual_provider(resource: Resource) -> SdkMeterProvider {
    let reader = ManualReader::builder().build();
    SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build()
}

fn otlp_provider(
    endpoint: &str,
    config: &TelemetryConfig,
    resource: Resource,
) -> std::result::Result<SdkMeterProvider, opentelemetry::metrics::MetricsError> {
    use opentelemetry_otlp::{Protocol, WithExportConfig};

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_protocol(Protocol::Grpc)
        .with_metadata(crate::logger::otlp_metadata(config));

    opentelemetry_otlp::new_pipeline()
        .metrics(opentelemetry_sdk::runtime::Tokio)
        .with_exporter(exporter)
        .with_period(EXPORT_PERIOD)
        .with_resource(resource)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        // First init should work
        init_metrics();
        // Second init should not panic
        init_metrics();
        assert!(meter().is_some());
    }

    #[test]
    fn test_factories_attach_instruments_after_init() {
        init_metrics();
        let requests = counter("test_requests_total", "Requests handled", "1");
        assert!(requests.is_exported());
        requests.inc(2.0).unwrap();
        assert_eq!(requests.value(), 2.0);

        let latency = histogram("test_latency_seconds", "Request latency", "s");
        latency.observe(0.25);
        assert_eq!(latency.count(), 1);

        let depth = gauge("test_queue_depth", "Queue depth", "1");
        depth.set(7.0);
        assert_eq!(depth.value(), 7.0);
    }
}
