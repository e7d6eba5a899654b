//! Environment variable parsing helpers.
//!
//! Invalid values never abort config loading: [`config_warning`] reports them
//! and the caller keeps its default.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::Level;

use crate::errors::{FoundationError, Result};

/// Env var selecting where config warnings are written (`stderr` or `stdout`).
pub const LOG_OUTPUT_ENV: &str = "FOUNDATION_LOG_OUTPUT";

/// Stream that receives log output and config warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    Stdout,
}

impl std::str::FromStr for LogOutput {
    type Err = FoundationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stderr" => Ok(Self::Stderr),
            "stdout" => Ok(Self::Stdout),
            other => Err(FoundationError::Validation(format!(
                "unknown log output: {other} (expected stderr or stdout)"
            ))),
        }
    }
}

impl LogOutput {
    /// Read [`LOG_OUTPUT_ENV`]. Unknown values fall back to stderr.
    pub fn from_env() -> Self {
        std::env::var(LOG_OUTPUT_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

/// Report a problem found while loading configuration.
///
/// Logging may not be set up yet, so this writes straight to the stream named
/// by `FOUNDATION_LOG_OUTPUT` as well as emitting a `tracing` warning.
pub fn config_warning(message: &str) {
    tracing::warn!(target: "provide_foundation::config", "{message}");
    let line = format!("[foundation config] WARNING: {message}\n");
    let _ = match LogOutput::from_env() {
        LogOutput::Stderr => std::io::stderr().write_all(line.as_bytes()),
        LogOutput::Stdout => std::io::stdout().write_all(line.as_bytes()),
    };
}

/// Parse a boolean in the usual env spellings.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Ok(true),
        "0" | "false" | "no" | "off" | "disabled" | "" => Ok(false),
        other => Err(FoundationError::Validation(format!(
            "invalid boolean value: {other}"
        ))),
    }
}

/// Split a separated list, trimming items and dropping empty ones.
pub fn parse_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `key=value` pairs separated by commas.
///
/// Keys and values are trimmed. A pair without `=` or with an empty key is an
/// error.
pub fn parse_dict(value: &str) -> Result<BTreeMap<String, String>> {
    let mut result = BTreeMap::new();
    for pair in parse_list(value, ',') {
        let (key, val) = pair.split_once('=').ok_or_else(|| {
            FoundationError::Validation(format!("invalid key=value pair: {pair}"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(FoundationError::Validation(format!(
                "empty key in pair: {pair}"
            )));
        }
        result.insert(key.to_string(), val.trim().to_string());
    }
    Ok(result)
}

/// Parse a log level name. `WARNING` and `CRITICAL` are accepted as aliases.
pub fn parse_log_level(value: &str) -> Result<Level> {
    match value.trim().to_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" => Ok(Level::ERROR),
        other => Err(FoundationError::Validation(format!(
            "invalid log level: {other}"
        ))),
    }
}

/// Canonical `EnvFilter` directive for a level name, e.g. `WARNING` -> `warn`.
///
/// `EnvFilter` reads unknown words as target names, so aliases must be
/// resolved before they reach a filter.
pub fn level_directive(value: &str) -> Result<String> {
    parse_log_level(value).map(|level| level.as_str().to_lowercase())
}

/// Parse a float and check it lies within `[min, max]`.
pub fn parse_float_with_validation(value: &str, min: f64, max: f64) -> Result<f64> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|e| FoundationError::Validation(format!("invalid float {value:?}: {e}")))?;
    if !(min..=max).contains(&parsed) {
        return Err(FoundationError::Validation(format!(
            "value {parsed} must be between {min} and {max}"
        )));
    }
    Ok(parsed)
}

/// Read and parse an env var, warning and returning `None` on bad input.
pub(crate) fn env_parsed<T>(name: &str, parse: impl FnOnce(&str) -> Result<T>) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            config_warning(&format!("ignoring {name}={raw:?}: {e}"));
            None
        }
    }
}
