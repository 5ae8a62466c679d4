//! Terminal output for mirrorsync.
//!
//! Structured per-event logging goes through `tracing`; this module prints the
//! short human summaries on stderr:
//! - Dimmed colors for routine messages
//! - Bold colors for warnings and errors
//! - Verbosity control (quiet, normal, verbose)

use crate::sync::{EventKind, PassResult};
use crate::utils::format_size;
use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity level for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress informational messages, show only warnings and errors.
    Quiet = 0,
    /// Default verbosity level, show all standard messages.
    Normal = 1,
    /// Show verbose debug messages in addition to standard output.
    Verbose = 2,
}

/// Global verbosity setting (default: Normal).
static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// Sets the global verbosity level for all output functions.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Gets the current global verbosity level.
pub fn get_verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Prints a success message in green (respects quiet mode).
pub fn success(message: &str) {
    if get_verbosity() == Verbosity::Quiet {
        return;
    }
    eprintln!("{}", message.green());
}

/// Prints an error message in bold red (always shown).
pub fn error(message: &str) {
    eprintln!("{}", message.red().bold());
}

/// Prints a warning message in bold yellow (always shown).
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Prints a verbose debug message (only in verbose mode).
pub fn verbose(message: &str) {
    if get_verbosity() != Verbosity::Verbose {
        return;
    }
    eprintln!("{}", message.dimmed());
}

/// One-line description of a pass, e.g. `2 created, 1 deleted (12 B) in 3ms`.
#[must_use]
pub fn pass_summary(result: &PassResult) -> String {
    if result.is_noop() {
        return "Already in sync".to_string();
    }

    let parts: Vec<String> = [
        (EventKind::DirCreated, "dirs created"),
        (EventKind::FileCreated, "created"),
        (EventKind::FileUpdated, "updated"),
        (EventKind::FileDeleted, "deleted"),
        (EventKind::DirRemoved, "dirs removed"),
        (EventKind::Error, "failed"),
    ]
    .iter()
    .filter_map(|(kind, label)| match result.count(*kind) {
        0 => None,
        n => Some(format!("{n} {label}")),
    })
    .collect();

    format!(
        "{} ({}) in {}",
        parts.join(", "),
        format_size(result.bytes_copied),
        humantime::format_duration(truncate_to_millis(result.duration))
    )
}

/// Prints the pass summary: failures in bold, changes in green, no-ops only when verbose.
pub fn print_pass_summary(pass: u64, result: &PassResult) {
    let line = format!("Pass {pass}: {}", pass_summary(result));
    if result.has_failures() {
        warning(&line);
        for event in result.errors() {
            error(&format!("  {event}"));
        }
    } else if result.is_noop() {
        verbose(&line);
    } else {
        success(&line);
    }
}

/// Drops sub-millisecond precision so durations print as `3ms`, not `3ms 41us 7ns`.
fn truncate_to_millis(duration: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
