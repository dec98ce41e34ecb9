//! Error taxonomy for the harness.
//!
//! Only configuration and workspace failures at startup are fatal. Every
//! per-iteration failure is caught at the workload-execution boundary and
//! recorded as outcome data instead of propagating further.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors; abort startup with a non-zero exit.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fatal workspace errors; abort startup with a non-zero exit.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The workspace directory could not be created or is not writable.
    #[error("Workspace unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Recoverable failure of a single workload execution.
///
/// Converted into a failed [`TestResult`](crate::types::TestResult) at the
/// execution boundary; the harness keeps running. The `stage` tag names the
/// sub-step that failed so diagnostics distinguish, for example, "couldn't
/// create the environment" from "couldn't install packages".
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// The external process exceeded its allotted time.
    #[error("{stage}: timed out after {timeout_secs}s")]
    Timeout {
        stage: &'static str,
        timeout_secs: u64,
    },

    /// The external tool exited non-zero or failed to spawn.
    #[error("{stage}: {message}")]
    ExternalTool {
        stage: &'static str,
        message: String,
    },

    /// The tool exited cleanly but left the wrong on-disk state behind.
    #[error("{stage}: {message}")]
    Verification {
        stage: &'static str,
        message: String,
    },

    /// A required persistent setup artifact is absent.
    #[error("persistent environment missing at {}", path.display())]
    SetupMissing { path: PathBuf },
}

impl WorkloadError {
    /// The sub-step in which the failure occurred.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Timeout { stage, .. }
            | Self::ExternalTool { stage, .. }
            | Self::Verification { stage, .. } => stage,
            Self::SetupMissing { .. } => "setup_check",
        }
    }
}

/// One-time setup failure for a workload.
///
/// The current attempt of the dependent workload fails, the name is not
/// marked complete, and setup is retried on a subsequent iteration.
#[derive(Debug, Error)]
#[error("setup for '{workload}' failed: {source}")]
pub struct SetupError {
    pub workload: String,
    #[source]
    pub source: WorkloadError,
}

/// Result sink failures.
///
/// Logged by the caller; the affected result row is dropped and the loop
/// continues. There is no durable queue or retry.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink is not connected")]
    NotConnected,

    #[error("failed to write result row: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode result row: {0}")]
    Encode(#[from] serde_json::Error),
}
