//! Logging bootstrap shared by the harness binaries.
//!
//! Builds a layered `tracing` subscriber: stdout for interactive runs plus
//! an optional non-blocking file appender for the `log_file` the
//! configuration names. Callers hold the returned guards for the process
//! lifetime so buffered lines are flushed on exit.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging configuration assembled from the config file and CLI flags.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    file: Option<PathBuf>,
}

impl LogConfig {
    /// Stdout-only logging at the given level.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            file: None,
        }
    }

    /// Override the log level (e.g. for a `--verbose` flag).
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Also append plain-text log lines to the given file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// Returns the appender guards; dropping them stops the background writer,
/// so the binary keeps them alive until exit.
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>> {
    let filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut guards = Vec::new();
    let file_layer = match &config.file {
        Some(path) => {
            let (dir, name) = split_log_path(path);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(&dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer())
        .try_init()
        .context("installing global tracing subscriber")?;

    Ok(guards)
}

/// Split a log file path into the directory and file name the appender
/// wants; a bare file name lands in the working directory.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fsload.log".to_string());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (dir, name)
}
