//! Foundation: the shared base layer for service tooling.
//!
//! Structured logging with trace correlation, OTLP export, layered
//! configuration, cached serialization and a handful of small utilities.
//!
//! # Modules
//!
//! - [`cli`]: Output helpers and the synthetic log generator
//! - [`config`]: Environment parsing, file loading and layered merging
//! - [`errors`]: Crate error type
//! - [`hub`]: Process-wide component registry
//! - [`integrations`]: OTLP helpers and OpenObserve authentication
//! - [`logger`]: `tracing` subscriber setup with JSON/console output
//! - [`metrics`]: OpenTelemetry meter setup and simple instruments
//! - [`serialization`]: YAML/JSON/TOML with an LRU parse cache
//! - [`tools`]: Tool-manager registry on top of the hub
//! - [`tracer`]: Lightweight in-process spans
//! - [`utils`]: Alignment arithmetic and version discovery

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // logger::LoggingHandle is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc,      // Panic docs can be verbose
    clippy::cast_precision_loss,     // u64 counts shown as f64 rates
    clippy::struct_excessive_bools,  // Config structs may have flags
    clippy::too_many_lines           // Some functions are inherently long
)]

pub mod cli;
pub mod config;
pub mod errors;
pub mod hub;
pub mod integrations;
pub mod logger;
pub mod metrics;
pub mod serialization;
pub mod tools;
pub mod tracer;
pub mod utils;

pub use errors::{FoundationError, Result};

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) request ID.
///
/// # Example
///
/// ```
/// let id = provide_foundation::generate_request_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_request_id() -> String {
    Uuid::now_v7().to_string()
}
