//! Workload execution against the target filesystem.
//!
//! Each workload kind drives one or more external processes with an
//! explicit timeout and returns the measured wall-clock seconds on
//! success. A timeout is treated identically to a non-zero exit status.
//! Transient artifacts are removed after every execution, success or
//! failure; removal is excluded from the measurement.

use crate::workspace::{self, Workspace};
use fsload_common::WorkloadError;
use fsload_common::config::{
    DEFAULT_CLONE_TIMEOUT_SECS, DEFAULT_ENV_CREATE_TIMEOUT_SECS, DEFAULT_IMPORT_TIMEOUT_SECS,
    DEFAULT_INSTALL_TIMEOUT_SECS,
};
use fsload_common::types::{WorkloadDefinition, WorkloadKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

pub type Result<T> = std::result::Result<T, WorkloadError>;

/// Executes workloads sequentially against a shared workspace.
pub struct TestExecutor {
    workspace: Workspace,
}

impl TestExecutor {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    /// Run one workload's timed body and return the measured seconds.
    ///
    /// A configured `timeout_seconds` override applies to every external
    /// stage of the workload; otherwise each stage uses its kind default.
    pub async fn execute(&self, def: &WorkloadDefinition) -> Result<f64> {
        match &def.kind {
            WorkloadKind::Clone { repository_url } => {
                self.run_clone(repository_url, def.stage_timeout(DEFAULT_CLONE_TIMEOUT_SECS))
                    .await
            }
            WorkloadKind::EnvInstall { packages } => {
                self.run_env_install(
                    packages,
                    def.stage_timeout(DEFAULT_ENV_CREATE_TIMEOUT_SECS),
                    def.stage_timeout(DEFAULT_INSTALL_TIMEOUT_SECS),
                )
                .await
            }
            WorkloadKind::ImportBench { import_target, .. } => {
                self.run_import_bench(
                    &def.name,
                    import_target,
                    def.stage_timeout(DEFAULT_IMPORT_TIMEOUT_SECS),
                )
                .await
            }
        }
    }

    /// Clone the repository into a fresh transient directory and verify the
    /// version-control marker. Measured time covers clone plus
    /// verification; cleanup happens afterward regardless of outcome.
    async fn run_clone(&self, repository_url: &str, timeout: Duration) -> Result<f64> {
        let clone_dir = self.workspace.transient_dir(workspace::TRANSIENT_REPO_PREFIX);
        let started = Instant::now();

        let outcome = async {
            let mut cmd = Command::new("git");
            cmd.arg("clone").arg(repository_url).arg(&clone_dir);
            run_stage("clone", timeout, &mut cmd).await?;

            if !clone_dir.join(".git").is_dir() {
                return Err(WorkloadError::Verification {
                    stage: "clone",
                    message: "repository was not properly cloned (missing .git)".to_string(),
                });
            }
            Ok(started.elapsed().as_secs_f64())
        }
        .await;

        workspace::remove_artifact(&clone_dir);
        outcome
    }

    /// Create a throwaway virtual environment, install the requested
    /// packages, and verify the installation by listing the environment.
    /// The environment is removed afterward regardless of outcome.
    async fn run_env_install(
        &self,
        packages: &[String],
        create_timeout: Duration,
        install_timeout: Duration,
    ) -> Result<f64> {
        let venv_dir = self.workspace.transient_dir(workspace::TRANSIENT_VENV_PREFIX);
        let started = Instant::now();

        let outcome = async {
            create_venv("env_create", &venv_dir, create_timeout).await?;
            install_packages("pkg_install", &venv_dir, packages, install_timeout).await?;

            let mut cmd = Command::new(pip_path(&venv_dir));
            cmd.arg("list");
            let listing = run_stage("verify", install_timeout, &mut cmd).await?;
            let listing = String::from_utf8_lossy(&listing.stdout).into_owned();
            for requirement in packages {
                if !listing_contains_package(&listing, requirement) {
                    return Err(WorkloadError::Verification {
                        stage: "verify",
                        message: format!(
                            "package '{requirement}' missing from environment listing"
                        ),
                    });
                }
            }
            Ok(started.elapsed().as_secs_f64())
        }
        .await;

        workspace::remove_artifact(&venv_dir);
        outcome
    }

    /// Spawn a fresh interpreter from the persistent environment, import
    /// the target library, and measure the spawn-to-exit time.
    async fn run_import_bench(
        &self,
        test_name: &str,
        import_target: &str,
        timeout: Duration,
    ) -> Result<f64> {
        let venv_dir = self.workspace.bench_venv_dir(test_name);
        if !venv_dir.exists() {
            return Err(WorkloadError::SetupMissing { path: venv_dir });
        }

        let started = Instant::now();
        let mut cmd = Command::new(python_path(&venv_dir));
        cmd.arg("-c").arg(format!("import {import_target}"));
        run_stage("import", timeout, &mut cmd).await?;
        Ok(started.elapsed().as_secs_f64())
    }

    /// Build the persistent benchmark environment for an import workload.
    ///
    /// A stale environment from an earlier run is rebuilt from scratch. On
    /// failure the partial artifact is removed so a later retry starts
    /// clean.
    pub async fn build_bench_env(&self, def: &WorkloadDefinition, import_target: &str) -> Result<()> {
        let venv_dir = self.workspace.bench_venv_dir(&def.name);
        workspace::remove_artifact(&venv_dir);

        let to_install = match &def.kind {
            WorkloadKind::ImportBench { packages, .. } if !packages.is_empty() => packages.clone(),
            _ => vec![import_target.to_string()],
        };

        let outcome = async {
            create_venv(
                "env_create",
                &venv_dir,
                def.stage_timeout(DEFAULT_ENV_CREATE_TIMEOUT_SECS),
            )
            .await?;
            install_packages(
                "pkg_install",
                &venv_dir,
                &to_install,
                def.stage_timeout(DEFAULT_INSTALL_TIMEOUT_SECS),
            )
            .await?;
            Ok(())
        }
        .await;

        if outcome.is_err() {
            workspace::remove_artifact(&venv_dir);
        }
        outcome
    }
}

async fn create_venv(stage: &'static str, venv_dir: &Path, timeout: Duration) -> Result<()> {
    let mut cmd = Command::new("python3");
    cmd.arg("-m").arg("venv").arg(venv_dir);
    run_stage(stage, timeout, &mut cmd).await.map(|_| ())
}

async fn install_packages(
    stage: &'static str,
    venv_dir: &Path,
    packages: &[String],
    timeout: Duration,
) -> Result<()> {
    let mut cmd = Command::new(pip_path(venv_dir));
    cmd.arg("install").args(packages);
    run_stage(stage, timeout, &mut cmd).await.map(|_| ())
}

/// Run one external stage to completion under a timeout, mapping failures
/// onto the workload error taxonomy.
async fn run_stage(
    stage: &'static str,
    timeout: Duration,
    command: &mut Command,
) -> Result<std::process::Output> {
    debug!("Running {} stage: {:?}", stage, command.as_std());
    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(WorkloadError::ExternalTool {
                stage,
                message: format!("failed to spawn: {e}"),
            });
        }
        Err(_) => {
            return Err(WorkloadError::Timeout {
                stage,
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(WorkloadError::ExternalTool {
            stage,
            message: format!("{}: {}", output.status, stderr.trim()),
        });
    }
    Ok(output)
}

/// Whether an installer listing mentions the requirement's distribution.
///
/// Distribution names compare case-insensitively with `-`, `_`, and `.`
/// treated as equivalent; any version specifier on the requirement is
/// ignored.
fn listing_contains_package(listing: &str, requirement: &str) -> bool {
    let wanted = normalize_distribution(base_requirement_name(requirement));
    listing.lines().any(|line| {
        line.split_whitespace()
            .next()
            .is_some_and(|name| normalize_distribution(name) == wanted)
    })
}

/// The distribution name portion of a requirement specifier.
fn base_requirement_name(requirement: &str) -> &str {
    let end = requirement
        .find(|c| "=<>!~;[ ".contains(c))
        .unwrap_or(requirement.len());
    requirement[..end].trim()
}

fn normalize_distribution(name: &str) -> String {
    name.to_lowercase().replace(['_', '.'], "-")
}

fn pip_path(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("pip.exe")
    } else {
        venv_dir.join("bin").join("pip")
    }
}

fn python_path(venv_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        venv_dir.join("Scripts").join("python.exe")
    } else {
        venv_dir.join("bin").join("python")
    }
}
