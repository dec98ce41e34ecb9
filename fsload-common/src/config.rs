//! Harness configuration loading and validation.
//!
//! The configuration is a TOML file owned exclusively by the harness
//! process and read-only after load. Any load or validation failure is a
//! [`ConfigError`] and fatal to startup.

use crate::errors::ConfigError;
use crate::types::{WorkloadDefinition, WorkloadKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for the version-control clone stage.
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 300;
/// Default timeout for virtual-environment creation.
pub const DEFAULT_ENV_CREATE_TIMEOUT_SECS: u64 = 60;
/// Default timeout for package installation.
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 300;
/// Default timeout for the import benchmark process.
pub const DEFAULT_IMPORT_TIMEOUT_SECS: u64 = 30;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("fsload.log")
}

fn default_loop_interval() -> u64 {
    300
}

fn default_sink_path() -> PathBuf {
    PathBuf::from("fsload_results.jsonl")
}

/// Result sink settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// JSONL file receiving one result row per workload execution.
    #[serde(default = "default_sink_path")]
    pub path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: default_sink_path(),
        }
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Unique identity for this harness instance's logical environment.
    pub setup_id: String,
    /// Filesystem root the workloads run against.
    pub target_path: PathBuf,
    /// Log level filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path; stdout output is always kept alongside it.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Wall-clock cadence of the workload loop, in seconds.
    #[serde(default = "default_loop_interval")]
    pub loop_interval_seconds: u64,
    /// Workload names to run each iteration, in declared order.
    #[serde(default)]
    pub enabled_tests: Vec<String>,
    /// Named workload definitions.
    #[serde(default)]
    pub test_definitions: BTreeMap<String, WorkloadDefinition>,
    /// Result sink settings.
    #[serde(default)]
    pub sink: SinkConfig,
}

impl HarnessConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw)?;
        // Definition names live in the table keys; copy them onto the
        // definitions so downstream code carries a self-contained value.
        for (name, def) in config.test_definitions.iter_mut() {
            def.name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.setup_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "setup_id must be a non-empty string".to_string(),
            ));
        }
        if self.target_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("target_path must be set".to_string()));
        }
        for (name, def) in &self.test_definitions {
            match &def.kind {
                WorkloadKind::Clone { repository_url } => {
                    if repository_url.trim().is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "test '{name}': repository_url must be non-empty"
                        )));
                    }
                }
                WorkloadKind::EnvInstall { packages } => {
                    if packages.is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "test '{name}': packages must list at least one package"
                        )));
                    }
                }
                WorkloadKind::ImportBench { import_target, .. } => {
                    if import_target.trim().is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "test '{name}': import_target must be non-empty"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// The loop cadence as a [`Duration`].
    pub fn loop_interval(&self) -> Duration {
        Duration::from_secs(self.loop_interval_seconds)
    }

    /// Default configuration file location (`~/.config/fsload/config.toml`,
    /// falling back to the working directory).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("fsload").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
