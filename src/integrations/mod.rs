//! Helpers for external telemetry backends.

pub mod openobserve;
pub mod otlp;

pub use otlp::{get_current_trace_context, TraceContext};
