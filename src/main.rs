//! foundation-loggen: synthetic log generator for testing log pipelines.
//!
//! # Usage
//!
//! ```bash
//! foundation-loggen --count 1000 --rate 50 --error-rate 0.05 --format json
//! ```
//!
//! Environment variables can also be used:
//! - `FOUNDATION_SERVICE_NAME`: Service name attached to every line
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Export spans to an OTLP collector
//! - `RUST_LOG`: Log filter (overrides `FOUNDATION_LOG_LEVEL`)

use std::io;
use std::time::Duration;

use clap::Parser;
use provide_foundation::cli::loggen::{self, RunConfig, Style};
use provide_foundation::cli::{echo_error, echo_info};
use provide_foundation::config::{LogFormat, LogOutput, TelemetryConfig};
use provide_foundation::logger::init_logging;
use provide_foundation::metrics::{init_metrics_with_config, shutdown_metrics};
use provide_foundation::utils::get_version;
use provide_foundation::utils::versioning::PACKAGE_NAME;
use tokio::sync::watch;

/// Generate synthetic service logs at a steady or bursty rate.
#[derive(Parser, Debug, Clone)]
#[command(name = "foundation-loggen", version, about)]
struct Args {
    /// Number of logs to send (0 = run until interrupted)
    #[arg(long, default_value_t = 100, env = "LOGGEN_COUNT")]
    count: u64,

    /// Target logs per second
    #[arg(long, default_value_t = 10.0, env = "LOGGEN_RATE")]
    rate: f64,

    /// Fraction of logs emitted as errors (0.0 - 1.0)
    #[arg(long, default_value_t = 0.1, env = "LOGGEN_ERROR_RATE")]
    error_rate: f64,

    /// Emission style: normal or burst
    #[arg(long, default_value = "normal")]
    style: Style,

    /// Log line format: console or json
    #[arg(long, env = "FOUNDATION_LOG_FORMAT")]
    format: Option<LogFormat>,

    /// OTLP collector endpoint for span export
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    /// Service name attached to generated logs
    #[arg(long, env = "FOUNDATION_SERVICE_NAME")]
    service_name: Option<String>,

    /// Seconds between progress lines
    #[arg(long, default_value_t = 5)]
    stats_interval: u64,
}

impl Args {
    fn telemetry_config(&self) -> TelemetryConfig {
        let mut config = TelemetryConfig::from_env();
        if let Some(name) = &self.service_name {
            config.service_name.clone_from(name);
        }
        if let Some(endpoint) = &self.otlp_endpoint {
            config.otlp_endpoint = Some(endpoint.clone());
        }
        if let Some(format) = self.format {
            config.logging.format = format;
        }
        // Logs go to stdout; progress and the banner to stderr.
        config.logging.output = LogOutput::Stdout;
        config
    }

    fn run_config(&self) -> RunConfig {
        RunConfig {
            count: self.count,
            rate: self.rate,
            error_rate: self.error_rate,
            style: self.style,
            stats_interval: Duration::from_secs(self.stats_interval.max(1)),
        }
    }
}

/// Print startup banner with version and run settings.
fn print_banner(args: &Args, config: &TelemetryConfig) {
    let count = if args.count == 0 {
        "unbounded".to_string()
    } else {
        args.count.to_string()
    };
    eprintln!(
        r#"
  foundation-loggen v{}

  Settings:
    Service:     {}
    Count:       {}
    Rate:        {} logs/sec
    Error rate:  {:.0}%
    Style:       {:?}
    OTLP:        {}

  Press Ctrl+C to stop.
"#,
        get_version(PACKAGE_NAME, None),
        config.service_name,
        count,
        args.rate,
        args.error_rate * 100.0,
        args.style,
        config.otlp_endpoint.as_deref().unwrap_or("disabled"),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let telemetry = args.telemetry_config();

    let logging = match init_logging(&telemetry) {
        Ok(handle) => handle,
        Err(e) => {
            echo_error(&format!("failed to initialize logging: {e}"));
            return Err(e.into());
        }
    };
    init_metrics_with_config(&telemetry);

    print_banner(&args, &telemetry);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    let _ = shutdown_tx.send(true);
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), stopping...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, stopping...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            tracing::info!("Received Ctrl+C, stopping...");
        }

        let _ = shutdown_tx.send(true);
    });

    let mut stderr = io::stderr();
    let (stats, elapsed) = loggen::run(&args.run_config(), shutdown_rx, &mut stderr).await?;
    loggen::print_final_stats(&mut stderr, &stats, elapsed)?;

    if let Err(e) = shutdown_metrics() {
        tracing::warn!(error = %e, "Metrics shutdown failed");
    }
    logging.shutdown();
    echo_info("Log generation finished");
    Ok(())
}
