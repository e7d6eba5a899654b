//! Logging bootstrap.
//!
//! Configures structured logging with:
//! - Console or JSON line output on stdout/stderr
//! - `RUST_LOG` or config-driven filtering, reloadable at runtime
//! - Optional OTLP span export through `tracing-opentelemetry`

pub mod format;

use std::io::IsTerminal;
use std::sync::Once;
use std::time::Duration;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::TracerProvider;
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::{
    LogFormat, LogOutput, LoggingConfig, TelemetryConfig, DEFAULT_SERVICE_NAME,
};
use crate::errors::{FoundationError, Result};
use crate::integrations::otlp::create_otlp_resource;

pub use format::JsonTraceFormat;

/// Instrumentation scope name for spans created through this crate.
const TRACER_NAME: &str = "provide-foundation";

/// Handle to the installed logging pipeline.
pub struct LoggingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    tracer_provider: Option<TracerProvider>,
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("otlp", &self.tracer_provider.is_some())
            .finish()
    }
}

impl LoggingHandle {
    /// Change the default level, keeping no per-module overrides.
    pub fn set_level(&self, level: &str) -> Result<()> {
        self.set_filter(&crate::config::level_directive(level)?)
    }

    /// Replace the whole filter with `EnvFilter` directives.
    pub fn set_filter(&self, directives: &str) -> Result<()> {
        let filter = EnvFilter::try_new(directives).map_err(|e| {
            FoundationError::Configuration(format!("invalid filter {directives:?}: {e}"))
        })?;
        self.filter
            .reload(filter)
            .map_err(|e| FoundationError::Telemetry(format!("failed to reload filter: {e}")))?;
        tracing::info!(directives, "Log filter updated");
        Ok(())
    }

    /// True if spans are exported over OTLP.
    pub fn otlp_enabled(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flush and stop span export.
    pub fn shutdown(self) {
        if self.tracer_provider.is_some() {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}

/// Install the global logging pipeline.
///
/// When OTLP trace export is configured this must be called from within a
/// Tokio runtime, since the batch exporter spawns onto it.
///
/// # Errors
///
/// Returns [`FoundationError::AlreadyInitialized`] if a global subscriber is
/// already set, or a configuration/telemetry error for invalid settings.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingHandle> {
    config.validate()?;

    let (filter, filter_handle) = reload::Layer::new(build_filter(&config.logging)?);

    let tracer_provider = if config.otlp_traces_active() {
        Some(init_otlp_tracer(config)?)
    } else {
        None
    };
    let otel_layer = tracer_provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME)));

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(fmt_layer(&config.logging, &config.service_name))
        .try_init()
        .map_err(|_| FoundationError::AlreadyInitialized("logging"))?;

    std::panic::set_hook(Box::new(|panic| {
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");
        tracing::error!("thread '{name}' {panic}");
    }));

    tracing::info!(
        service = %config.service_name,
        format = ?config.logging.format,
        otlp = tracer_provider.is_some(),
        "Logging initialized"
    );

    Ok(LoggingHandle {
        filter: filter_handle,
        tracer_provider,
    })
}

/// Like [`init_logging`] with defaults and the given filter, but can be
/// called multiple times. Later calls are ignored.
pub fn init_logging_reentrant(filter: &str) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let logging = LoggingConfig::default();
        let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer(&logging, DEFAULT_SERVICE_NAME))
            .try_init();
    });
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}

/// `RUST_LOG` wins over the configured levels when it is set.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    config.validate()?;
    EnvFilter::try_new(config.filter_directives())
        .map_err(|e| FoundationError::Configuration(format!("invalid log filter: {e}")))
}

fn fmt_layer<S>(config: &LoggingConfig, service_name: &str) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    let (writer, is_terminal) = match config.output {
        LogOutput::Stdout => (
            BoxMakeWriter::new(std::io::stdout),
            std::io::stdout().is_terminal(),
        ),
        LogOutput::Stderr => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
    };

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .event_format(JsonTraceFormat::new(service_name))
            .boxed(),
        LogFormat::Console => tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(is_terminal)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    }
}

fn init_otlp_tracer(config: &TelemetryConfig) -> Result<TracerProvider> {
    let endpoint = config
        .otlp_endpoint
        .as_deref()
        .ok_or_else(|| FoundationError::Configuration("otlp_endpoint is not set".into()))?;

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(5))
        .with_metadata(otlp_metadata(config));

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default().with_resource(create_otlp_resource(config)),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|e| FoundationError::Telemetry(format!("failed to create OTLP tracer: {e}")))?;

    opentelemetry::global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// gRPC metadata from configured OTLP headers. Invalid entries are skipped.
pub(crate) fn otlp_metadata(config: &TelemetryConfig) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (name, value) in &config.otlp_headers {
        let key = MetadataKey::<Ascii>::from_bytes(name.to_lowercase().as_bytes());
        let value = value.parse::<MetadataValue<Ascii>>();
        match (key, value) {
            (Ok(key), Ok(value)) => {
                metadata.insert(key, value);
            }
            _ => crate::config::config_warning(&format!("skipping invalid OTLP header {name:?}")),
        }
    }
    metadata
}
