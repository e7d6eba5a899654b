//! CLI helpers shared by foundation binaries.
//!
//! - [`OutputFormat`] for `--format text|json` flags
//! - `echo_*` status lines, coloured when the stream is a terminal
//! - [`loggen`]: synthetic log generation with throughput stats

pub mod loggen;

use std::io::{self, IsTerminal, Write};

use serde::Serialize;

use crate::errors::Result;
use crate::serialization::json_dumps;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tone {
    Success,
    Error,
    Warning,
    Info,
}

impl Tone {
    fn ansi(self) -> &'static str {
        match self {
            Tone::Success => "\x1b[32m",
            Tone::Error => "\x1b[31m",
            Tone::Warning => "\x1b[33m",
            Tone::Info => "\x1b[36m",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Tone::Success => "✓",
            Tone::Error => "✗",
            Tone::Warning => "⚠",
            Tone::Info => "ℹ",
        }
    }
}

/// Format a status line, optionally wrapped in ANSI colour codes.
fn render(tone: Tone, message: &str, color: bool) -> String {
    if color {
        format!("{}{} {}\x1b[0m", tone.ansi(), tone.prefix(), message)
    } else {
        format!("{} {}", tone.prefix(), message)
    }
}

fn echo_to_stdout(tone: Tone, message: &str) {
    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let _ = writeln!(stdout.lock(), "{}", render(tone, message, color));
}

pub fn echo_success(message: &str) {
    echo_to_stdout(Tone::Success, message);
}

pub fn echo_info(message: &str) {
    echo_to_stdout(Tone::Info, message);
}

pub fn echo_warning(message: &str) {
    let stderr = io::stderr();
    let color = stderr.is_terminal();
    let _ = writeln!(stderr.lock(), "{}", render(Tone::Warning, message, color));
}

/// Errors go to stderr.
pub fn echo_error(message: &str) {
    let stderr = io::stderr();
    let color = stderr.is_terminal();
    let _ = writeln!(stderr.lock(), "{}", render(Tone::Error, message, color));
}

/// Print `value` as pretty JSON on stdout.
pub fn echo_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", json_dumps(value, Some(2))?);
    Ok(())
}
