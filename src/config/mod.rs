//! Configuration for logging and telemetry.
//!
//! Supports:
//! - Sensible defaults for quick start
//! - Environment variable overrides (`from_env`)
//! - YAML, JSON or TOML files ([`load_config_file`])
//! - Layered merging ([`merge::deep_merge`])

pub mod env;
pub mod merge;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{FoundationError, Result};
use crate::serialization;

pub use env::{
    config_warning, parse_bool, parse_dict, parse_float_with_validation, parse_list,
    level_directive, parse_log_level, LogOutput,
};
pub use merge::deep_merge;

/// Default service name when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "provide-service";

/// Line format for log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Console,
    /// One JSON object per line with trace context.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = FoundationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" | "text" | "key_value" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            other => Err(FoundationError::Validation(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Per-target overrides, e.g. `hyper = "warn"`
    pub module_levels: BTreeMap<String, String>,
    /// Include source file and line in console output
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Console,
            output: LogOutput::Stderr,
            module_levels: BTreeMap::new(),
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `FOUNDATION_LOG_*` variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = env::env_parsed("FOUNDATION_LOG_LEVEL", level_directive) {
            config.level = level;
        }
        if let Some(format) = env::env_parsed("FOUNDATION_LOG_FORMAT", |v| v.parse()) {
            config.format = format;
        }
        if let Some(output) = env::env_parsed(env::LOG_OUTPUT_ENV, |v| v.parse()) {
            config.output = output;
        }
        if let Some(levels) = env::env_parsed("FOUNDATION_LOG_MODULE_LEVELS", parse_dict) {
            config.module_levels = levels;
        }
        if let Some(location) = env::env_parsed("FOUNDATION_LOG_INCLUDE_LOCATION", parse_bool) {
            config.include_location = location;
        }
        config
    }

    /// Check that every level name is recognised.
    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.level)?;
        for (target, level) in &self.module_levels {
            parse_log_level(level).map_err(|e| {
                FoundationError::Configuration(format!("module level for {target}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Render the `EnvFilter` directive string for this config.
    ///
    /// Level aliases are mapped to their `tracing` names; unknown levels are
    /// passed through as-is and rejected by [`validate`](Self::validate).
    pub fn filter_directives(&self) -> String {
        let canonical =
            |level: &str| level_directive(level).unwrap_or_else(|_| level.trim().to_lowercase());
        let mut directives = vec![canonical(&self.level)];
        directives.extend(
            self.module_levels
                .iter()
                .map(|(target, level)| format!("{target}={}", canonical(level))),
        );
        directives.join(",")
    }
}

/// Telemetry (service identity + OTLP export) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: Option<String>,
    /// Deployment environment (e.g. "production")
    pub environment: Option<String>,
    /// OTLP collector endpoint; export is disabled when unset
    pub otlp_endpoint: Option<String>,
    pub otlp_headers: BTreeMap<String, String>,
    pub traces_enabled: bool,
    pub metrics_enabled: bool,
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.into(),
            service_version: None,
            environment: None,
            otlp_endpoint: None,
            otlp_headers: BTreeMap::new(),
            traces_enabled: true,
            metrics_enabled: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by `FOUNDATION_*` and standard `OTEL_*` variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            logging: LoggingConfig::from_env(),
            ..Self::default()
        };

        let non_empty = |v: &str| -> Result<String> {
            let v = v.trim();
            if v.is_empty() {
                Err(FoundationError::Validation("value is empty".into()))
            } else {
                Ok(v.to_string())
            }
        };

        if let Some(name) = env::env_parsed("OTEL_SERVICE_NAME", non_empty)
            .or_else(|| env::env_parsed("FOUNDATION_SERVICE_NAME", non_empty))
        {
            config.service_name = name;
        }
        config.service_version = env::env_parsed("FOUNDATION_SERVICE_VERSION", non_empty);
        config.environment = env::env_parsed("FOUNDATION_ENVIRONMENT", non_empty);
        config.otlp_endpoint = env::env_parsed("OTEL_EXPORTER_OTLP_ENDPOINT", non_empty);
        if let Some(headers) = env::env_parsed("OTEL_EXPORTER_OTLP_HEADERS", parse_dict) {
            config.otlp_headers = headers;
        }
        if let Some(enabled) = env::env_parsed("OTEL_TRACES_ENABLED", parse_bool) {
            config.traces_enabled = enabled;
        }
        if let Some(enabled) = env::env_parsed("OTEL_METRICS_ENABLED", parse_bool) {
            config.metrics_enabled = enabled;
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(FoundationError::Configuration(
                "service_name cannot be empty".into(),
            ));
        }
        if let Some(endpoint) = &self.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(FoundationError::Configuration(format!(
                    "otlp_endpoint must be an http(s) URL, got {endpoint}"
                )));
            }
        }
        self.logging.validate()
    }

    /// True when spans should be exported over OTLP.
    pub fn otlp_traces_active(&self) -> bool {
        self.traces_enabled && self.otlp_endpoint.is_some()
    }
}

/// Load a config file, choosing the parser from its extension
/// (`.yaml`/`.yml`, `.json`, `.toml`).
pub fn load_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "yaml" | "yml" => serialization::yaml_loads(&contents),
        "json" => serialization::json_loads(&contents),
        "toml" => serialization::toml_loads(&contents),
        other => Err(FoundationError::Configuration(format!(
            "unsupported config file extension {other:?} for {}",
            path.display()
        ))),
    }
}

/// Load several config files and merge them in order, later files winning.
pub fn load_layered<T: DeserializeOwned>(paths: &[&Path]) -> Result<T> {
    let mut merged = serde_json::Value::Object(serde_json::Map::new());
    for path in paths {
        let layer: serde_json::Value = load_config_file(path)?;
        deep_merge(&mut merged, layer);
    }
    serde_json::from_value(merged)
        .map_err(|e| FoundationError::Configuration(format!("invalid merged config: {e}")))
}
