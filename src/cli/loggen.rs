//! Synthetic log generation for exercising logging pipelines.
//!
//! [`LogGenerator`] produces plausible service log entries; [`run`] emits
//! them through `tracing` at a target rate and reports throughput with
//! [`print_stats`].

use std::io::{self, Write};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::watch;

use crate::errors::{FoundationError, Result};
use crate::metrics;
use crate::tracer::FoundationSpan;

const SERVICES: [&str; 6] = [
    "api-gateway",
    "auth-service",
    "billing",
    "inventory",
    "notifications",
    "search",
];

const OPERATIONS: [&str; 8] = [
    "create_order",
    "get_user",
    "list_items",
    "process_payment",
    "refresh_token",
    "send_email",
    "update_profile",
    "validate_cart",
];

const SUCCESS_MESSAGES: [&str; 4] = [
    "Request completed",
    "Cache hit",
    "Record updated",
    "Response sent",
];

const ERROR_MESSAGES: [&str; 4] = [
    "Upstream timeout",
    "Database connection refused",
    "Validation failed",
    "Rate limit exceeded",
];

/// Emission pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Style {
    /// Evenly spaced at the target rate.
    #[default]
    Normal,
    /// Groups of [`BURST_SIZE`] logs sent back to back, then a pause.
    Burst,
}

/// Logs per burst in [`Style::Burst`].
pub const BURST_SIZE: u64 = 10;

impl std::str::FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "burst" => Ok(Self::Burst),
            _ => Err(format!("unknown style: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One generated log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub sequence: u64,
    pub service: &'static str,
    pub operation: &'static str,
    pub level: EntryLevel,
    pub message: &'static str,
    pub duration_ms: u64,
    pub trace_id: String,
    pub span_id: String,
    pub request_id: String,
}

impl LogEntry {
    pub fn is_error(&self) -> bool {
        self.level == EntryLevel::Error
    }
}

/// Produces random log entries with a configurable error rate.
pub struct LogGenerator {
    rng: StdRng,
    error_rate: f64,
    sequence: u64,
}

impl LogGenerator {
    /// `error_rate` is the probability (0.0..=1.0) of an error entry.
    pub fn new(error_rate: f64) -> Result<Self> {
        Self::with_rng(error_rate, StdRng::from_entropy())
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(error_rate: f64, seed: u64) -> Result<Self> {
        Self::with_rng(error_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(error_rate: f64, rng: StdRng) -> Result<Self> {
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(FoundationError::Validation(format!(
                "error rate must be between 0.0 and 1.0, got {error_rate}"
            )));
        }
        Ok(Self {
            rng,
            error_rate,
            sequence: 0,
        })
    }

    pub fn next_entry(&mut self) -> LogEntry {
        self.sequence += 1;
        let is_error = self.rng.gen_bool(self.error_rate);

        let (level, message) = if is_error {
            (EntryLevel::Error, pick(&mut self.rng, &ERROR_MESSAGES))
        } else {
            let level = match self.rng.gen_range(0..10) {
                0 => EntryLevel::Debug,
                1 => EntryLevel::Warn,
                _ => EntryLevel::Info,
            };
            (level, pick(&mut self.rng, &SUCCESS_MESSAGES))
        };

        // Errors tend to be slow.
        let duration_ms = if is_error {
            self.rng.gen_range(500..5000)
        } else {
            self.rng.gen_range(1..400)
        };

        let operation = pick(&mut self.rng, &OPERATIONS);
        let span = FoundationSpan::new(operation);

        LogEntry {
            sequence: self.sequence,
            service: pick(&mut self.rng, &SERVICES),
            operation,
            level,
            message,
            duration_ms,
            trace_id: span.trace_id(),
            span_id: span.span_id(),
            request_id: crate::generate_request_id(),
        }
    }
}

fn pick(rng: &mut StdRng, items: &[&'static str]) -> &'static str {
    items[rng.gen_range(0..items.len())]
}

/// Running totals for a generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    pub total_sent: u64,
    pub total_errors: u64,
}

impl GeneratorStats {
    pub fn record(&mut self, entry: &LogEntry) {
        self.total_sent += 1;
        if entry.is_error() {
            self.total_errors += 1;
        }
    }

    /// Logs per second over `elapsed`; 0 for an empty interval.
    pub fn rate(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_sent as f64 / secs
        } else {
            0.0
        }
    }

    /// Percentage of entries that were errors.
    pub fn error_percentage(&self) -> f64 {
        if self.total_sent == 0 {
            0.0
        } else {
            self.total_errors as f64 * 100.0 / self.total_sent as f64
        }
    }
}

/// One progress line: `Sent: N logs | Rate: R logs/sec | Errors: E (P%)`.
pub fn print_stats<W: Write>(
    out: &mut W,
    stats: &GeneratorStats,
    elapsed: Duration,
) -> io::Result<()> {
    writeln!(
        out,
        "Sent: {} logs | Rate: {:.1} logs/sec | Errors: {} ({:.1}%)",
        stats.total_sent,
        stats.rate(elapsed),
        stats.total_errors,
        stats.error_percentage()
    )
}

/// Summary block printed when a run ends.
pub fn print_final_stats<W: Write>(
    out: &mut W,
    stats: &GeneratorStats,
    elapsed: Duration,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Generation complete")?;
    writeln!(out, "  Total sent:   {}", stats.total_sent)?;
    writeln!(
        out,
        "  Errors:       {} ({:.1}%)",
        stats.total_errors,
        stats.error_percentage()
    )?;
    writeln!(out, "  Duration:     {:.2}s", elapsed.as_secs_f64())?;
    writeln!(out, "  Average rate: {:.1} logs/sec", stats.rate(elapsed))
}

/// Settings for [`run`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stop after this many logs (0 = until shutdown)
    pub count: u64,
    /// Target logs per second
    pub rate: f64,
    pub error_rate: f64,
    pub style: Style,
    /// How often progress lines are printed
    pub stats_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            count: 100,
            rate: 10.0,
            error_rate: 0.1,
            style: Style::Normal,
            stats_interval: Duration::from_secs(5),
        }
    }
}

/// Emit one entry through `tracing`.
///
/// The entry's ids are logged as fields; an active OpenTelemetry or
/// foundation span takes precedence in JSON output. The generated service
/// goes in `source_service` since `service` is the emitting process.
pub fn emit(entry: &LogEntry) {
    let span = tracing::info_span!("loggen", service = entry.service, operation = entry.operation);
    let _entered = span.enter();

    macro_rules! emit_at {
        ($level:ident) => {
            tracing::$level!(
                sequence = entry.sequence,
                source_service = entry.service,
                operation = entry.operation,
                duration_ms = entry.duration_ms,
                trace_id = %entry.trace_id,
                span_id = %entry.span_id,
                request_id = %entry.request_id,
                "{}",
                entry.message
            )
        };
    }

    match entry.level {
        EntryLevel::Debug => emit_at!(debug),
        EntryLevel::Info => emit_at!(info),
        EntryLevel::Warn => emit_at!(warn),
        EntryLevel::Error => emit_at!(error),
    }
}

/// Longest pause between batches.
const MAX_TICK_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Interval between batches of `batch` logs at `rate` logs/sec.
///
/// Rates whose period would round to zero or exceed [`MAX_TICK_PERIOD`] are
/// rejected.
fn tick_period(rate: f64, batch: u64) -> Result<Duration> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(FoundationError::Validation(format!(
            "rate must be positive, got {rate}"
        )));
    }
    let period = Duration::try_from_secs_f64(batch as f64 / rate)
        .ok()
        .filter(|period| *period <= MAX_TICK_PERIOD)
        .ok_or_else(|| FoundationError::Validation(format!("rate {rate} is too low")))?;
    if period.is_zero() {
        return Err(FoundationError::Validation(format!(
            "rate {rate} is too high"
        )));
    }
    Ok(period)
}

/// Generate logs until `config.count` is reached or `shutdown` flips to true.
///
/// Progress lines are written to `out` every `stats_interval`.
pub async fn run<W: Write>(
    config: &RunConfig,
    mut shutdown: watch::Receiver<bool>,
    out: &mut W,
) -> Result<(GeneratorStats, Duration)> {
    let batch = match config.style {
        Style::Normal => 1,
        Style::Burst => BURST_SIZE,
    };
    let period = tick_period(config.rate, batch)?;

    let mut generator = LogGenerator::new(config.error_rate)?;
    let mut stats = GeneratorStats::default();
    let sent_counter = metrics::counter("loggen_logs_sent_total", "Generated log entries", "1");
    let error_counter = metrics::counter("loggen_errors_total", "Generated error entries", "1");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let started = Instant::now();
    let mut last_report = started;

    'outer: loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                tracing::info!("Shutdown requested, stopping generation");
                break;
            }
        }

        for _ in 0..batch {
            if config.count > 0 && stats.total_sent >= config.count {
                break 'outer;
            }
            let entry = generator.next_entry();
            emit(&entry);
            stats.record(&entry);
            sent_counter.inc(1.0)?;
            if entry.is_error() {
                error_counter.inc(1.0)?;
            }
        }

        if last_report.elapsed() >= config.stats_interval {
            print_stats(out, &stats, started.elapsed())?;
            last_report = Instant::now();
        }
    }

    Ok((stats, started.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    #[test]
    fn test_error_rate_bounds() {
        assert!(LogGenerator::new(-0.1).is_err());
        assert!(LogGenerator::new(1.5).is_err());
        assert!(LogGenerator::new(0.0).is_ok());
    }

    #[test]
    fn test_error_rate_extremes() {
        let mut never = LogGenerator::seeded(0.0, 7).unwrap();
        assert!((0..200).all(|_| !never.next_entry().is_error()));

        let mut always = LogGenerator::seeded(1.0, 7).unwrap();
        assert!((0..200).all(|_| always.next_entry().is_error()));
    }

    #[test]
    fn test_entries_are_sequenced() {
        let mut generator = LogGenerator::seeded(0.2, 1).unwrap();
        let first = generator.next_entry();
        let second = generator.next_entry();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_ne!(first.request_id, second.request_id);
        assert_eq!(first.trace_id.len(), 32);
        assert_eq!(first.span_id.len(), 16);
        assert!(SERVICES.contains(&first.service));
    }

    /// Records the field names of every event.
    #[derive(Clone, Default)]
    struct FieldNames(Arc<Mutex<Vec<String>>>);

    impl tracing::field::Visit for FieldNames {
        fn record_debug(&mut self, field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {
            self.0.lock().unwrap().push(field.name().to_string());
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for FieldNames {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            event.record(&mut self.clone());
        }
    }

    #[test]
    fn test_emit_carries_generated_service() {
        let names = FieldNames::default();
        let subscriber = tracing_subscriber::registry().with(names.clone());
        let entry = LogGenerator::seeded(0.0, 3).unwrap().next_entry();

        tracing::subscriber::with_default(subscriber, || emit(&entry));

        let names = names.0.lock().unwrap();
        for field in ["source_service", "operation", "trace_id", "request_id"] {
            assert!(names.iter().any(|n| n == field), "missing {field}");
        }
        assert!(!names.iter().any(|n| n == "service"));
    }

    #[test]
    fn test_print_stats_line() {
        let stats = GeneratorStats {
            total_sent: 50,
            total_errors: 5,
        };
        let mut out = Vec::new();
        print_stats(&mut out, &stats, Duration::from_secs(10)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Sent: 50 logs | Rate: 5.0 logs/sec | Errors: 5 (10.0%)\n"
        );
    }

    #[test]
    fn test_stats_with_zero_elapsed() {
        let stats = GeneratorStats::default();
        assert_eq!(stats.rate(Duration::ZERO), 0.0);
        assert_eq!(stats.error_percentage(), 0.0);
    }

    #[test]
    fn test_print_final_stats() {
        let stats = GeneratorStats {
            total_sent: 20,
            total_errors: 1,
        };
        let mut out = Vec::new();
        print_final_stats(&mut out, &stats, Duration::from_secs(4)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Total sent:   20"));
        assert!(text.contains("Errors:       1 (5.0%)"));
        assert!(text.contains("Average rate: 5.0 logs/sec"));
    }

    #[tokio::test]
    async fn test_run_stops_at_count() {
        let (_tx, rx) = watch::channel(false);
        let config = RunConfig {
            count: 25,
            rate: 1000.0,
            error_rate: 0.0,
            style: Style::Burst,
            stats_interval: Duration::from_secs(60),
        };
        let mut out = Vec::new();
        let (stats, _) = run(&config, rx, &mut out).await.unwrap();
        assert_eq!(stats.total_sent, 25);
        assert_eq!(stats.total_errors, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let config = RunConfig {
            count: 0,
            rate: 50.0,
            ..RunConfig::default()
        };
        let handle = tokio::spawn(async move {
            let mut out = Vec::new();
            run(&config, rx, &mut out).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        let (stats, _) = handle.await.unwrap().unwrap();
        assert!(stats.total_sent > 0);
    }

    #[tokio::test]
    async fn test_run_rejects_bad_rate() {
        let (_tx, rx) = watch::channel(false);
        let config = RunConfig {
            rate: 0.0,
            ..RunConfig::default()
        };
        let mut out = Vec::new();
        assert!(run(&config, rx, &mut out).await.is_err());
    }

    #[test]
    fn test_tick_period_bounds() {
        assert_eq!(tick_period(10.0, 1).unwrap(), Duration::from_millis(100));
        assert_eq!(tick_period(10.0, BURST_SIZE).unwrap(), Duration::from_secs(1));
        assert!(tick_period(f64::NAN, 1).is_err());
        assert!(tick_period(-1.0, 1).is_err());
    }

    #[tokio::test]
    async fn test_run_rejects_extreme_rates() {
        for rate in [1e300, 1e-20, f64::MIN_POSITIVE] {
            let (_tx, rx) = watch::channel(false);
            let config = RunConfig {
                rate,
                ..RunConfig::default()
            };
            let mut out = Vec::new();
            assert!(
                matches!(
                    run(&config, rx, &mut out).await,
                    Err(FoundationError::Validation(_))
                ),
                "rate {rate} should be rejected"
            );
        }
    }
}
