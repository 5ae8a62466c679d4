use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::field::RecordFields;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::fmt::format::{DefaultFields, Writer};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Field formatter for the log file.
///
/// Formatted span fields are cached per formatter type. A type distinct from
/// the stdout layer's [`DefaultFields`] keeps the file from reusing the colored
/// stdout rendering of span fields.
#[derive(Debug, Default)]
struct PlainFields(DefaultFields);

impl<'writer> FormatFields<'writer> for PlainFields {
    fn format_fields<R: RecordFields>(&self, writer: Writer<'writer>, fields: R) -> fmt::Result {
        self.0.format_fields(writer, fields)
    }
}

/// Filter for one output: `RUST_LOG` when set, `level` otherwise.
fn filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {level}"))
}

/// Initialize the global tracing subscriber.
///
/// Events go to stdout filtered by `stdout_level` and, when `log_file` is
/// given, to that file filtered by `file_level` (truncated first, without
/// ANSI colors). Quieting the terminal never drops events from the file.
/// `RUST_LOG` takes precedence over both levels when set.
///
/// # Errors
///
/// Returns an error if the log file cannot be created, a filter directive is
/// invalid, or a global subscriber is already installed.
pub fn init(log_file: Option<&Path>, file_level: &str, stdout_level: &str) -> Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(filter(stdout_level)?);

    let file_layer = log_file
        .map(|path| {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            Ok::<_, anyhow::Error>(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .fmt_fields(PlainFields::default())
                    .with_writer(Mutex::new(file))
                    .with_filter(filter(file_level)?),
            )
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Logging already initialized")?;

    Ok(())
}
