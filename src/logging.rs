use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Where log lines go when no log file was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Stderr,
    /// The terminal UI owns the screen; anything written to stderr would
    /// tear it.
    Discard,
}

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// The returned guard flushes buffered lines on drop and must live until the
/// program exits.
pub fn init(log_file: Option<&Path>, verbose: bool, fallback: Fallback) -> Result<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("repopick={default_level}")));

    let (writer, guard) = match (log_file, fallback) {
        (Some(path), _) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        (None, Fallback::Stderr) => tracing_appender::non_blocking(std::io::stderr()),
        (None, Fallback::Discard) => tracing_appender::non_blocking(std::io::sink()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none() && fallback == Fallback::Stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install logger: {e}"))?;

    Ok(guard)
}
