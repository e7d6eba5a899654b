//! JSON-per-line event format with trace-context injection.
//!
//! Every event becomes one JSON object:
//!
//! ```json
//! {"timestamp":"2026-01-01T00:00:00.000Z","level":"INFO","target":"app",
//!  "message":"started","span":"request","service":"api",
//!  "trace_id":"…","span_id":"…","trace_flags":"01","user_id":42}
//! ```
//!
//! Trace ids come from the OpenTelemetry data of the current `tracing` span
//! when the OpenTelemetry layer is installed, otherwise from the in-process
//! [`crate::tracer`].

use std::fmt::{self, Write as _};

use chrono::SecondsFormat;
use opentelemetry::trace::{TraceContextExt, TraceFlags};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_opentelemetry::OtelData;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::integrations::otlp::{inject_trace_context, TraceContext};
use crate::tracer;

/// Keys owned by the formatter; event fields with these names are dropped.
const RESERVED_KEYS: [&str; 5] = ["timestamp", "level", "target", "span", "service"];

#[derive(Debug, Clone, Default)]
pub struct JsonTraceFormat {
    service_name: Option<String>,
}

impl JsonTraceFormat {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: Some(service_name.into()),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonTraceFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut fields = Map::new();
        event.record(&mut JsonVisitor(&mut fields));

        let mut record = Map::new();
        record.insert(
            "timestamp".into(),
            chrono::Utc::now()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .into(),
        );
        record.insert("level".into(), meta.level().as_str().into());
        record.insert("target".into(), meta.target().into());
        if let Some(message) = fields.remove("message") {
            record.insert("message".into(), message);
        }
        if let Some(span) = ctx.lookup_current() {
            record.insert("span".into(), span.name().into());
        }
        if let Some(service) = &self.service_name {
            record.insert("service".into(), service.clone().into());
        }

        let trace = span_trace_context(ctx).or_else(tracer::current_span_context);
        if let Some(trace) = &trace {
            inject_trace_context(&mut record, trace);
        }

        for (key, value) in fields {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                record.entry(key).or_insert(value);
            }
        }

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// Trace context stored by the OpenTelemetry layer on the current span.
fn span_trace_context<S, N>(ctx: &FmtContext<'_, S, N>) -> Option<TraceContext>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    let span = ctx.lookup_current()?;
    let extensions = span.extensions();
    let otel = extensions.get::<OtelData>()?;

    let parent = otel.parent_cx.span();
    let parent_sc = parent.span_context();
    let trace_id = otel
        .builder
        .trace_id
        .or_else(|| parent_sc.is_valid().then(|| parent_sc.trace_id()))?;
    let span_id = otel.builder.span_id?;
    let flags = if parent_sc.is_valid() {
        parent_sc.trace_flags()
    } else {
        TraceFlags::SAMPLED
    };

    Some(TraceContext {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        trace_flags: Some(flags.to_u8()),
    })
}

/// Collects event fields into a JSON map.
struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0.insert(field.name().into(), value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().into(), format!("{value:?}").into());
    }
}
