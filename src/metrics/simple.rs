//! Counter, gauge and histogram that keep an in-memory value and optionally
//! forward to an OpenTelemetry instrument.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use opentelemetry::metrics::{Counter, Gauge, Histogram};
use opentelemetry::KeyValue;

use crate::errors::{FoundationError, Result};

/// An `f64` stored as bits in an `AtomicU64`.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }

    /// Add `delta` and return the new value.
    fn add(&self, delta: f64) -> f64 {
        loop {
            let current = self.0.load(Ordering::SeqCst);
            let next = f64::from_bits(current) + delta;
            if self
                .0
                .compare_exchange(current, next.to_bits(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return next;
            }
            // CAS failed, retry
        }
    }
}

/// Monotonic counter.
#[derive(Debug)]
pub struct SimpleCounter {
    name: String,
    value: AtomicF64,
    otel: Option<Counter<f64>>,
}

impl SimpleCounter {
    pub fn new(name: impl Into<String>, otel: Option<Counter<f64>>) -> Self {
        Self {
            name: name.into(),
            value: AtomicF64::default(),
            otel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increase by `amount`. Negative or non-finite amounts are rejected.
    pub fn inc(&self, amount: f64) -> Result<f64> {
        self.inc_with_attributes(amount, &[])
    }

    pub fn inc_with_attributes(&self, amount: f64, attributes: &[KeyValue]) -> Result<f64> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(FoundationError::Validation(format!(
                "counter {} can only increase, got {amount}",
                self.name
            )));
        }
        if let Some(otel) = &self.otel {
            otel.add(amount, attributes);
        }
        Ok(self.value.add(amount))
    }

    pub fn value(&self) -> f64 {
        self.value.load()
    }

    /// True if updates are forwarded to OpenTelemetry.
    pub fn is_exported(&self) -> bool {
        self.otel.is_some()
    }
}

/// Value that can go up and down.
#[derive(Debug)]
pub struct SimpleGauge {
    name: String,
    value: AtomicF64,
    otel: Option<Gauge<f64>>,
}

impl SimpleGauge {
    pub fn new(name: impl Into<String>, otel: Option<Gauge<f64>>) -> Self {
        Self {
            name: name.into(),
            value: AtomicF64::default(),
            otel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self, value: f64) {
        self.set_with_attributes(value, &[]);
    }

    pub fn set_with_attributes(&self, value: f64, attributes: &[KeyValue]) {
        self.value.store(value);
        self.export(value, attributes);
    }

    pub fn inc(&self, amount: f64) -> f64 {
        let value = self.value.add(amount);
        self.export(value, &[]);
        value
    }

    pub fn dec(&self, amount: f64) -> f64 {
        self.inc(-amount)
    }

    pub fn value(&self) -> f64 {
        self.value.load()
    }

    fn export(&self, value: f64, attributes: &[KeyValue]) {
        if let Some(otel) = &self.otel {
            otel.record(value, attributes);
        }
    }
}

/// Summary of recorded observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramSummary {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Distribution of observed values; every observation is kept.
#[derive(Debug)]
pub struct SimpleHistogram {
    name: String,
    observations: Mutex<Vec<f64>>,
    otel: Option<Histogram<f64>>,
}

impl SimpleHistogram {
    pub fn new(name: impl Into<String>, otel: Option<Histogram<f64>>) -> Self {
        Self {
            name: name.into(),
            observations: Mutex::new(Vec::new()),
            otel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observe(&self, value: f64) {
        self.observe_with_attributes(value, &[]);
    }

    pub fn observe_with_attributes(&self, value: f64, attributes: &[KeyValue]) {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
        if let Some(otel) = &self.otel {
            otel.record(value, attributes);
        }
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn sum(&self) -> f64 {
        self.lock().iter().sum()
    }

    /// Copy of all observations in recording order.
    pub fn observations(&self) -> Vec<f64> {
        self.lock().clone()
    }

    pub fn min(&self) -> Option<f64> {
        self.summary().map(|s| s.min)
    }

    pub fn max(&self) -> Option<f64> {
        self.summary().map(|s| s.max)
    }

    /// Arithmetic mean; `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        self.summary().map(|s| s.mean)
    }

    /// `None` until something has been observed.
    pub fn summary(&self) -> Option<HistogramSummary> {
        let observations = self.lock();
        if observations.is_empty() {
            return None;
        }
        let sum: f64 = observations.iter().sum();
        let min = observations.iter().copied().fold(f64::INFINITY, f64::min);
        let max = observations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(HistogramSummary {
            count: observations.len(),
            sum,
            min,
            max,
            mean: sum / observations.len() as f64,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<f64>> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counter_increments() {
        let counter = SimpleCounter::new("jobs", None);
        assert_eq!(counter.inc(1.0).unwrap(), 1.0);
        assert_eq!(counter.inc(2.5).unwrap(), 3.5);
        assert_eq!(counter.value(), 3.5);
        assert!(!counter.is_exported());
    }

    #[test]
    fn test_counter_rejects_negative() {
        let counter = SimpleCounter::new("jobs", None);
        assert!(counter.inc(-1.0).is_err());
        assert!(counter.inc(f64::NAN).is_err());
        assert_eq!(counter.value(), 0.0);
    }

    #[test]
    fn test_counter_concurrent_increments() {
        let counter = Arc::new(SimpleCounter::new("hits", None));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.inc(1.0).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.value(), 8000.0);
    }

    #[test]
    fn test_gauge_up_and_down() {
        let gauge = SimpleGauge::new("connections", None);
        gauge.set(10.0);
        assert_eq!(gauge.inc(5.0), 15.0);
        assert_eq!(gauge.dec(20.0), -5.0);
        assert_eq!(gauge.value(), -5.0);
    }

    #[test]
    fn test_histogram_summary() {
        let histogram = SimpleHistogram::new("latency", None);
        assert!(histogram.summary().is_none());

        for v in [0.5, 1.5, 4.0] {
            histogram.observe(v);
        }
        let summary = histogram.summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.sum, 6.0);
        assert_eq!(summary.min, 0.5);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.mean, 2.0);
        assert_eq!(histogram.observations(), vec![0.5, 1.5, 4.0]);
    }

    #[test]
    fn test_histogram_min_max_mean() {
        let histogram = SimpleHistogram::new("payload_size", None);
        assert_eq!(histogram.min(), None);
        assert_eq!(histogram.mean(), None);

        for v in [8.0, -2.0, 3.0] {
            histogram.observe(v);
        }
        assert_eq!(histogram.min(), Some(-2.0));
        assert_eq!(histogram.max(), Some(8.0));
        assert_eq!(histogram.mean(), Some(3.0));
    }
}
