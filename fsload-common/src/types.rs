//! Common types used across harness components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of external workload a test case drives, with its
/// kind-specific parameters.
///
/// The set is closed: the executor matches exhaustively, so a new workload
/// kind is a compile-time change rather than a dispatch-table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkloadKind {
    /// Clone a repository into a transient directory and verify the result.
    Clone {
        /// URL (or local path) passed to the version-control clone command.
        repository_url: String,
    },
    /// Create a throwaway virtual environment and install packages into it.
    EnvInstall {
        /// Packages handed to the installer, in order.
        packages: Vec<String>,
    },
    /// Time a library import in a fresh interpreter spawned from a
    /// persistent per-workload environment.
    ImportBench {
        /// Module name passed to `import`.
        import_target: String,
        /// Distributions installed into the persistent environment during
        /// setup. Empty means "install the import target itself", which
        /// covers the common case where module and distribution share a
        /// name.
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl WorkloadKind {
    /// Stable label used in logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clone { .. } => "clone",
            Self::EnvInstall { .. } => "env_install",
            Self::ImportBench { .. } => "import_bench",
        }
    }
}

/// Immutable descriptor for a single named workload.
///
/// Loaded once at startup from the `test_definitions` config table; the
/// `name` field is filled from the table key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadDefinition {
    /// Workload name (the `test_definitions` key).
    #[serde(skip)]
    pub name: String,
    /// Workload kind with its kind-specific parameters.
    #[serde(flatten)]
    pub kind: WorkloadKind,
    /// Whether a one-time setup action must complete before the first run.
    #[serde(default)]
    pub setup_required: bool,
    /// Per-workload override for external-process stage timeouts.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl WorkloadDefinition {
    /// Stage timeout for this workload: the configured override, or the
    /// caller-supplied per-kind default.
    pub fn stage_timeout(&self, default_secs: u64) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds.unwrap_or(default_secs))
    }
}

/// One row of outcome data for a single workload execution.
///
/// Exactly one of these is produced per execution, success or failure, and
/// handed to the result sink. The field set matches the reference persisted
/// shape: `setup_id, test_name, start_time, execution_time_seconds,
/// success, error_message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Identity of this harness instance's logical environment.
    pub setup_id: String,
    /// Name of the executed workload.
    pub test_name: String,
    /// UTC wall-clock time at which execution began.
    pub start_time: DateTime<Utc>,
    /// Measured wall-clock seconds (or elapsed-until-failure on error).
    pub execution_time_seconds: f64,
    /// Whether the workload succeeded.
    pub success: bool,
    /// Failure detail; `None` on success.
    pub error_message: Option<String>,
}
