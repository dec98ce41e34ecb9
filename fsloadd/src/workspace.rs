//! Per-host workspace management for workload artifacts.
//!
//! The workspace is a private directory under the configured target path.
//! Transient artifacts (clone checkouts, throwaway virtualenvs) are named
//! with well-known prefixes so they can be purged without touching the
//! persistent per-workload setup environments.

use fsload_common::WorkspaceError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix for transient repository clone directories.
pub const TRANSIENT_REPO_PREFIX: &str = "test_repo_";
/// Prefix for transient virtual-environment directories.
pub const TRANSIENT_VENV_PREFIX: &str = "test_venv_";
/// Prefix for persistent benchmark environments, named by workload identity.
pub const BENCH_VENV_PREFIX: &str = "bench_venv_";

/// Owns the harness working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory tree if absent and verify write access by
    /// creating and deleting a probe file. Failure here is fatal to the
    /// harness and never retried.
    pub fn ensure(&self) -> Result<(), WorkspaceError> {
        let probe = || -> std::io::Result<()> {
            std::fs::create_dir_all(&self.root)?;
            let probe = self
                .root
                .join(format!(".write_probe_{}", std::process::id()));
            std::fs::write(&probe, b"probe")?;
            std::fs::remove_file(&probe)?;
            Ok(())
        };
        probe().map_err(|source| WorkspaceError::Unavailable {
            path: self.root.clone(),
            source,
        })?;
        debug!("Workspace verified: {}", self.root.display());
        Ok(())
    }

    /// Fresh, collision-free path for a transient directory with the given
    /// prefix. Same-second executions stay distinct via the random suffix.
    pub fn transient_dir(&self, prefix: &str) -> PathBuf {
        let stamp = chrono::Utc::now().timestamp();
        let nonce: u32 = rand::random();
        self.root.join(format!("{prefix}{stamp}_{nonce:08x}"))
    }

    /// Path of the persistent benchmark environment for a workload name.
    pub fn bench_venv_dir(&self, test_name: &str) -> PathBuf {
        self.root.join(format!("{BENCH_VENV_PREFIX}{test_name}"))
    }

    /// Remove transient artifacts left behind by clone/install workloads.
    ///
    /// Persistent setup environments are left alone. Removal is best-effort
    /// per entry; a failure is logged and the scan continues. Running this
    /// twice in a row is a no-op the second time.
    pub fn purge_transient(&self) {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Error during cleanup scan of {}: {}", self.root.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !is_transient_name(name) {
                continue;
            }
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => debug!("Cleaned up artifact: {}", path.display()),
                Err(e) => warn!("Failed to remove artifact {}: {}", path.display(), e),
            }
        }
    }

    /// Remove everything under the workspace root, persistent artifacts
    /// included. Used only by lifecycle shutdown.
    pub fn purge_all(&self) -> std::io::Result<()> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Best-effort removal of a single artifact directory.
pub fn remove_artifact(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(path) {
        warn!("Failed to remove artifact {}: {}", path.display(), e);
    }
}

fn is_transient_name(name: &str) -> bool {
    name.starts_with(TRANSIENT_REPO_PREFIX) || name.starts_with(TRANSIENT_VENV_PREFIX)
}
