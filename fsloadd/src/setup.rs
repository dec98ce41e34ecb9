//! One-time setup tracking for workloads that need a persistent environment.

use crate::executor::TestExecutor;
use fsload_common::SetupError;
use fsload_common::types::{WorkloadDefinition, WorkloadKind};
use std::collections::HashSet;
use tracing::{info, warn};

/// Tracks which workload names have completed setup in this process
/// lifetime.
///
/// The set starts empty on every process start: setup is intentionally
/// redone after a restart rather than trusting stale disk state, and the
/// rebuild is idempotent.
#[derive(Debug, Default)]
pub struct SetupTracker {
    completed: HashSet<String>,
}

impl SetupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the named workload's setup has completed.
    pub fn is_complete(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    /// Run the workload's setup action unless it has already completed.
    ///
    /// On failure nothing is recorded, so the next iteration retries; the
    /// caller treats the error as the current attempt's failure.
    pub async fn ensure_setup(
        &mut self,
        executor: &TestExecutor,
        def: &WorkloadDefinition,
    ) -> Result<(), SetupError> {
        if self.completed.contains(&def.name) {
            return Ok(());
        }

        info!("Running setup for test: {}", def.name);
        match &def.kind {
            WorkloadKind::ImportBench { import_target, .. } => {
                executor
                    .build_bench_env(def, import_target)
                    .await
                    .map_err(|source| SetupError {
                        workload: def.name.clone(),
                        source,
                    })?;
            }
            other => {
                warn!(
                    "No setup action for test type '{}'; marking '{}' as prepared",
                    other.label(),
                    def.name
                );
            }
        }

        self.completed.insert(def.name.clone());
        info!("Setup completed for test: {}", def.name);
        Ok(())
    }
}
