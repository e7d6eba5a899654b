//! OTLP helpers: endpoint and header construction, resource attributes and
//! trace-context extraction.
//!
//! Trace-context lookups are best effort. When OpenTelemetry has no valid span
//! the in-process [`crate::tracer`] is consulted, and when neither has one the
//! result is `None`.

use std::collections::BTreeMap;

use opentelemetry::trace::{SpanContext, TraceContextExt};
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use serde::{Deserialize, Serialize};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::TelemetryConfig;
use crate::tracer;

/// OTLP signal types, each with its own HTTP path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl Signal {
    pub fn path(self) -> &'static str {
        match self {
            Signal::Traces => "/v1/traces",
            Signal::Metrics => "/v1/metrics",
            Signal::Logs => "/v1/logs",
        }
    }
}

/// Trace identifiers attached to a log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    /// 32 lowercase hex characters
    pub trace_id: String,
    /// 16 lowercase hex characters
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_flags: Option<u8>,
}

impl TraceContext {
    /// Convert an OpenTelemetry span context; `None` if it is invalid.
    pub fn from_span_context(sc: &SpanContext) -> Option<Self> {
        sc.is_valid().then(|| Self {
            trace_id: sc.trace_id().to_string(),
            span_id: sc.span_id().to_string(),
            trace_flags: Some(sc.trace_flags().to_u8()),
        })
    }
}

/// Append the signal path to a base collector URL.
///
/// Trailing slashes are dropped, and a base that already ends with the path
/// is returned unchanged.
pub fn build_otlp_endpoint(base: &str, signal: Signal) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with(signal.path()) {
        base.to_string()
    } else {
        format!("{base}{}", signal.path())
    }
}

/// Merge configured headers with integration auth headers. Auth wins.
pub fn build_otlp_headers(
    base: &BTreeMap<String, String>,
    auth: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut headers = base.clone();
    if let Some(auth) = auth {
        headers.extend(auth.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    headers
}

/// Standard resource attributes for a service.
pub fn build_resource_attributes(
    service_name: &str,
    service_version: Option<&str>,
    environment: Option<&str>,
) -> Vec<KeyValue> {
    let mut attributes = vec![KeyValue::new("service.name", service_name.to_string())];
    if let Some(version) = service_version {
        attributes.push(KeyValue::new("service.version", version.to_string()));
    }
    if let Some(env) = environment {
        attributes.push(KeyValue::new("deployment.environment", env.to_string()));
    }
    attributes
}

/// OpenTelemetry resource describing the configured service.
pub fn create_otlp_resource(config: &TelemetryConfig) -> Resource {
    Resource::new(build_resource_attributes(
        &config.service_name,
        config.service_version.as_deref(),
        config.environment.as_deref(),
    ))
}

pub fn format_trace_id(trace_id: u128) -> String {
    format!("{trace_id:032x}")
}

pub fn format_span_id(span_id: u64) -> String {
    format!("{span_id:016x}")
}

/// Trace context of the current span, if any.
pub fn get_current_trace_context() -> Option<TraceContext> {
    otel_trace_context().or_else(tracer::current_span_context)
}

fn otel_trace_context() -> Option<TraceContext> {
    let from_tracing = tracing::Span::current().context();
    if let Some(ctx) = TraceContext::from_span_context(from_tracing.span().span_context()) {
        return Some(ctx);
    }
    let native = opentelemetry::Context::current();
    TraceContext::from_span_context(native.span().span_context())
}

/// Insert `trace_id`, `span_id` and `trace_flags` into `attributes` when a
/// trace is active. Existing keys are left alone.
///
/// Returns true if a trace context was found.
pub fn add_trace_context_to_attributes(
    attributes: &mut serde_json::Map<String, serde_json::Value>,
) -> bool {
    match get_current_trace_context() {
        Some(ctx) => {
            inject_trace_context(attributes, &ctx);
            true
        }
        None => false,
    }
}

pub(crate) fn inject_trace_context(
    attributes: &mut serde_json::Map<String, serde_json::Value>,
    ctx: &TraceContext,
) {
    attributes
        .entry("trace_id")
        .or_insert_with(|| ctx.trace_id.clone().into());
    attributes
        .entry("span_id")
        .or_insert_with(|| ctx.span_id.clone().into());
    if let Some(flags) = ctx.trace_flags {
        attributes
            .entry("trace_flags")
            .or_insert_with(|| format!("{flags:02x}").into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::FoundationSpan;
    use opentelemetry::trace::{SpanId, TraceFlags, TraceId, TraceState};

    #[test]
    fn test_build_otlp_endpoint() {
        assert_eq!(
            build_otlp_endpoint("http://collector:4318", Signal::Logs),
            "http://collector:4318/v1/logs"
        );
        assert_eq!(
            build_otlp_endpoint("http://collector:4318/", Signal::Traces),
            "http://collector:4318/v1/traces"
        );
        assert_eq!(
            build_otlp_endpoint("http://collector:4318/v1/metrics", Signal::Metrics),
            "http://collector:4318/v1/metrics"
        );
    }

    #[test]
    fn test_build_otlp_headers_auth_wins() {
        let mut base = BTreeMap::new();
        base.insert("authorization".to_string(), "old".to_string());
        base.insert("x-tenant".to_string(), "acme".to_string());
        let mut auth = BTreeMap::new();
        auth.insert("authorization".to_string(), "Basic abc".to_string());

        let headers = build_otlp_headers(&base, Some(&auth));
        assert_eq!(headers["authorization"], "Basic abc");
        assert_eq!(headers["x-tenant"], "acme");
        assert_eq!(build_otlp_headers(&base, None), base);
    }

    #[test]
    fn test_resource_attributes() {
        let attrs = build_resource_attributes("api", Some("1.0.0"), None);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].key.as_str(), "service.name");
    }

    #[test]
    fn test_format_ids() {
        assert_eq!(format_trace_id(0xabc), "00000000000000000000000000000abc");
        assert_eq!(format_span_id(1), "0000000000000001");
    }

    #[test]
    fn test_from_span_context() {
        assert!(TraceContext::from_span_context(&SpanContext::empty_context()).is_none());

        let sc = SpanContext::new(
            TraceId::from(0x1234u128),
            SpanId::from(0x56u64),
            TraceFlags::SAMPLED,
            false,
            TraceState::default(),
        );
        let ctx = TraceContext::from_span_context(&sc).unwrap();
        assert_eq!(ctx.trace_id, format_trace_id(0x1234));
        assert_eq!(ctx.span_id, format_span_id(0x56));
        assert_eq!(ctx.trace_flags, Some(1));
    }

    #[test]
    fn test_no_context_outside_spans() {
        let mut attrs = serde_json::Map::new();
        assert!(!add_trace_context_to_attributes(&mut attrs));
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_falls_back_to_internal_tracer() {
        let span = FoundationSpan::new("request");
        let _guard = span.enter();

        let mut attrs = serde_json::Map::new();
        attrs.insert("span_id".into(), "keep-me".into());
        assert!(add_trace_context_to_attributes(&mut attrs));
        assert_eq!(attrs["trace_id"], span.trace_id());
        assert_eq!(attrs["span_id"], "keep-me");
        assert_eq!(attrs["trace_flags"], "01");
    }
}
