//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Normal output goes to stdout; warnings, errors, and progress go to
//! stderr so `--json` output stays machine-readable. The quiet flag
//! suppresses everything except errors and explicitly requested data.

use std::fmt::Display;

use serde::Serialize;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Minimal output.
    Quiet,
    /// Standard output.
    Normal,
    /// Verbose output.
    Verbose,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }
}

/// Output sink configured from the global CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    verbosity: Verbosity,
    json: bool,
}

impl Output {
    pub fn new(quiet: bool, verbose: bool, json: bool) -> Self {
        Self {
            verbosity: Verbosity::from_flags(quiet, verbose),
            json,
        }
    }

    /// Whether `--json` was requested.
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print a line (suppressed when quiet).
    pub fn println(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            println!("{message}");
        }
    }

    /// Print an empty line (suppressed when quiet).
    pub fn blank(&self) {
        if self.verbosity != Verbosity::Quiet {
            println!();
        }
    }

    /// Print a diagnostic line (verbose mode only).
    pub fn verbose(&self, message: impl Display) {
        if self.verbosity == Verbosity::Verbose {
            eprintln!("{message}");
        }
    }

    /// Print a warning (suppressed when quiet).
    pub fn warn(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            eprintln!("warning: {message}");
        }
    }

    /// Print an error (always shown).
    pub fn error(&self, message: impl Display) {
        eprintln!("error: {message}");
    }

    /// Print a success line (suppressed when quiet).
    pub fn success(&self, message: impl Display) {
        if self.verbosity != Verbosity::Quiet {
            println!("{message}");
        }
    }

    /// Print a value as pretty JSON on stdout.
    pub fn json(&self, value: &impl Serialize) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Banner for dry runs.
    pub fn dry_run_header(&self) {
        self.println("(dry run - no changes will be made)");
    }
}

/// Human-readable byte size.
pub fn format_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= UNIT as f64 && unit < 5 {
        value /= UNIT as f64;
        unit += 1;
    }
    format!("{value:.1} {}B", b"KMGTP"[unit - 1] as char)
}
