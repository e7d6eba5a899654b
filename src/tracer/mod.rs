//! Lightweight in-process span tracking.
//!
//! Used when no OpenTelemetry span is active, so log lines can still be
//! correlated. The active span context lives on a thread-local stack that
//! [`FoundationSpan::enter`] pushes and the returned guard pops.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::integrations::otlp::{format_span_id, format_trace_id, TraceContext};

/// Sampled flag, as in W3C trace context.
const FLAG_SAMPLED: u8 = 0x01;

thread_local! {
    static ACTIVE: RefCell<Vec<TraceContext>> = const { RefCell::new(Vec::new()) };
}

/// Outcome recorded on a finished span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    Unset,
    Ok,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct FoundationSpan {
    pub name: String,
    trace_id: u128,
    span_id: u64,
    parent_span_id: Option<u64>,
    started: Instant,
    duration: Option<Duration>,
    pub attributes: BTreeMap<String, String>,
    pub status: SpanStatus,
}

impl FoundationSpan {
    /// Start a span. It joins the currently entered trace, if any.
    pub fn new(name: impl Into<String>) -> Self {
        let mut rng = rand::thread_rng();
        let (trace_id, parent_span_id) = match current_ids() {
            Some((trace_id, span_id)) => (trace_id, Some(span_id)),
            None => (non_zero_u128(&mut rng), None),
        };
        Self {
            name: name.into(),
            trace_id,
            span_id: non_zero_u64(&mut rng),
            parent_span_id,
            started: Instant::now(),
            duration: None,
            attributes: BTreeMap::new(),
            status: SpanStatus::Unset,
        }
    }

    /// Start a child of this span regardless of what is entered.
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trace_id: self.trace_id,
            span_id: non_zero_u64(&mut rand::thread_rng()),
            parent_span_id: Some(self.span_id),
            started: Instant::now(),
            duration: None,
            attributes: BTreeMap::new(),
            status: SpanStatus::Unset,
        }
    }

    pub fn trace_id(&self) -> String {
        format_trace_id(self.trace_id)
    }

    pub fn span_id(&self) -> String {
        format_span_id(self.span_id)
    }

    pub fn parent_span_id(&self) -> Option<String> {
        self.parent_span_id.map(format_span_id)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl ToString) {
        self.attributes.insert(key.into(), value.to_string());
    }

    /// Mark the span finished. Later calls keep the first duration.
    pub fn finish(&mut self, status: SpanStatus) -> Duration {
        let duration = *self.duration.get_or_insert_with(|| self.started.elapsed());
        self.status = status;
        duration
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn context(&self) -> TraceContext {
        TraceContext {
            trace_id: self.trace_id(),
            span_id: self.span_id(),
            trace_flags: Some(FLAG_SAMPLED),
        }
    }

    /// Make this span the current one on this thread until the guard drops.
    pub fn enter(&self) -> SpanGuard {
        ACTIVE.with(|stack| stack.borrow_mut().push(self.context()));
        SpanGuard { _private: () }
    }
}

/// Pops the entered span when dropped.
#[must_use = "the span is only current while the guard is alive"]
pub struct SpanGuard {
    _private: (),
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        ACTIVE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Context of the innermost entered span on this thread.
pub fn current_span_context() -> Option<TraceContext> {
    ACTIVE.with(|stack| stack.borrow().last().cloned())
}

fn current_ids() -> Option<(u128, u64)> {
    let ctx = current_span_context()?;
    let trace_id = u128::from_str_radix(&ctx.trace_id, 16).ok()?;
    let span_id = u64::from_str_radix(&ctx.span_id, 16).ok()?;
    Some((trace_id, span_id))
}

fn non_zero_u128(rng: &mut impl Rng) -> u128 {
    loop {
        let id: u128 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}

fn non_zero_u64(rng: &mut impl Rng) -> u64 {
    loop {
        let id: u64 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}
