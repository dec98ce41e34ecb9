//! Fixed-cadence scheduling of the enabled workload set.
//!
//! A single task drives the loop; workloads within an iteration run
//! strictly sequentially in declared order, so nothing races over the
//! shared workspace. Every per-workload failure is contained at the
//! execution boundary and becomes a failed result row rather than
//! aborting the iteration or the process.

use crate::executor::TestExecutor;
use crate::lifecycle::ShutdownSignal;
use crate::setup::SetupTracker;
use crate::sink::ResultSink;
use crate::workspace::Workspace;
use chrono::Utc;
use fsload_common::types::{TestResult, WorkloadDefinition};
use fsload_common::{HarnessConfig, SinkError};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// The harness instance: configuration, workspace, executor, setup state,
/// and the result sink, with an explicit start/run/shutdown lifecycle.
pub struct Harness<S: ResultSink> {
    config: HarnessConfig,
    workspace: Workspace,
    executor: TestExecutor,
    setup: SetupTracker,
    sink: S,
}

impl<S: ResultSink> Harness<S> {
    pub fn new(config: HarnessConfig, workspace: Workspace, sink: S) -> Self {
        let executor = TestExecutor::new(workspace.clone());
        Self {
            config,
            workspace,
            executor,
            setup: SetupTracker::new(),
            sink,
        }
    }

    /// Connect the result sink. A failure here is fatal to startup.
    pub fn start(&mut self) -> Result<(), SinkError> {
        self.sink.connect()
    }

    /// Run iterations at the configured cadence until shutdown is
    /// requested. Returns once the request is observed; teardown is the
    /// caller's next step.
    pub async fn run(&mut self, shutdown: &ShutdownSignal) {
        info!(
            "Starting filesystem load test loop (interval: {}s)",
            self.config.loop_interval_seconds
        );

        loop {
            if shutdown.is_triggered() {
                info!("Shutdown requested, draining test loop");
                return;
            }

            let iteration_started = Instant::now();
            info!("Starting new test loop iteration");
            self.run_iteration(shutdown).await;

            // Stray artifacts from this iteration are swept before waiting.
            self.workspace.purge_transient();

            let elapsed = iteration_started.elapsed();
            let interval = self.config.loop_interval();
            let wait = wait_duration(interval, elapsed);
            if wait.is_zero() {
                warn!(
                    "Test loop iteration took {:.1}s, longer than the configured {}s interval",
                    elapsed.as_secs_f64(),
                    self.config.loop_interval_seconds
                );
                continue;
            }

            info!("Waiting {:.1} seconds until next iteration", wait.as_secs_f64());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.recv() => {
                    info!("Shutdown requested during inter-iteration wait");
                    return;
                }
            }
        }
    }

    /// Execute every enabled workload once, in declared order.
    async fn run_iteration(&mut self, shutdown: &ShutdownSignal) {
        let enabled = self.config.enabled_tests.clone();
        for name in &enabled {
            if shutdown.is_triggered() {
                info!("Shutdown requested, skipping remaining workloads");
                return;
            }
            match self.config.test_definitions.get(name).cloned() {
                Some(def) => self.execute_test_case(&def).await,
                None => warn!("Unknown test case: {name}"),
            }
        }
    }

    /// Execute one workload and hand exactly one result row to the sink,
    /// success or failure.
    async fn execute_test_case(&mut self, def: &WorkloadDefinition) {
        let start_time = Utc::now();
        let started = Instant::now();
        info!("Starting test: {}", def.name);

        let (execution_time_seconds, success, error_message) = match self.run_workload(def).await {
            Ok(seconds) => {
                info!("Test {} completed in {:.2} seconds", def.name, seconds);
                (seconds, true, None)
            }
            Err(message) => {
                error!("Test {} failed: {}", def.name, message);
                (started.elapsed().as_secs_f64(), false, Some(message))
            }
        };

        let result = TestResult {
            setup_id: self.config.setup_id.clone(),
            test_name: def.name.clone(),
            start_time,
            execution_time_seconds,
            success,
            error_message,
        };
        if let Err(e) = self.sink.record(&result) {
            // Acceptable loss: the row is dropped and the loop continues.
            error!("Failed to log result for {}: {}", def.name, e);
        }
    }

    /// One-time setup (when declared and not yet done) followed by the
    /// timed workload body.
    async fn run_workload(&mut self, def: &WorkloadDefinition) -> Result<f64, String> {
        if def.setup_required && !self.setup.is_complete(&def.name) {
            self.setup
                .ensure_setup(&self.executor, def)
                .await
                .map_err(|e| e.to_string())?;
        }
        self.executor.execute(def).await.map_err(|e| e.to_string())
    }

    /// Best-effort teardown: each step runs even if an earlier one fails,
    /// and failures are logged rather than raised.
    pub fn shutdown(&mut self) {
        info!("Tearing down harness");
        let mut failures = 0u32;

        if let Err(e) = self.workspace.purge_all() {
            failures += 1;
            warn!("Workspace purge failed during teardown: {e}");
        }
        if self.sink.is_connected()
            && let Err(e) = self.sink.disconnect()
        {
            failures += 1;
            warn!("Sink disconnect failed during teardown: {e}");
        }

        if failures == 0 {
            info!("Teardown complete");
        } else {
            warn!("Teardown complete with {failures} failed cleanup steps");
        }
    }
}

/// Time to wait before the next iteration: the configured interval minus
/// what the iteration consumed, floored at zero.
fn wait_duration(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsload_common::types::WorkloadKind;
    use std::collections::BTreeMap;

    /// In-memory sink capturing rows for assertions.
    #[derive(Default)]
    struct MemorySink {
        connected: bool,
        rows: Vec<TestResult>,
    }

    impl ResultSink for MemorySink {
        fn connect(&mut self) -> Result<(), SinkError> {
            self.connected = true;
            Ok(())
        }

        fn record(&mut self, result: &TestResult) -> Result<(), SinkError> {
            if !self.connected {
                return Err(SinkError::NotConnected);
            }
            self.rows.push(result.clone());
            Ok(())
        }

        fn disconnect(&mut self) -> Result<(), SinkError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn bench_def(name: &str) -> WorkloadDefinition {
        WorkloadDefinition {
            name: name.to_string(),
            kind: WorkloadKind::ImportBench {
                import_target: "numpy".to_string(),
                packages: Vec::new(),
            },
            setup_required: false,
            timeout_seconds: None,
        }
    }

    fn test_harness(
        enabled: &[&str],
        definitions: &[WorkloadDefinition],
        interval_secs: u64,
    ) -> (tempfile::TempDir, Harness<MemorySink>) {
        let dir = tempfile::tempdir().unwrap();
        let mut test_definitions = BTreeMap::new();
        for def in definitions {
            test_definitions.insert(def.name.clone(), def.clone());
        }
        let mut config = HarnessConfig::parse(&format!(
            r#"
            setup_id = "unit"
            target_path = "{}"
            loop_interval_seconds = {interval_secs}
            "#,
            dir.path().join("fsload").display()
        ))
        .unwrap();
        config.enabled_tests = enabled.iter().map(|s| s.to_string()).collect();
        config.test_definitions = test_definitions;

        let workspace = Workspace::new(&config.target_path);
        workspace.ensure().unwrap();
        let mut harness = Harness::new(config, workspace, MemorySink::default());
        harness.start().unwrap();
        (dir, harness)
    }

    #[test]
    fn test_wait_duration_subtracts_iteration_time() {
        let wait = wait_duration(Duration::from_secs(10), Duration::from_secs(3));
        assert_eq!(wait, Duration::from_secs(7));
    }

    #[test]
    fn test_wait_duration_floors_overrun_at_zero() {
        let wait = wait_duration(Duration::from_secs(10), Duration::from_secs(12));
        assert_eq!(wait, Duration::ZERO);
        assert_eq!(
            wait_duration(Duration::ZERO, Duration::from_millis(1)),
            Duration::ZERO
        );
    }

    #[tokio::test]
    async fn test_unknown_test_name_is_skipped_without_a_row() {
        let (_dir, mut harness) = test_harness(&["ghost"], &[], 0);
        let (shutdown, _trigger) = ShutdownSignal::manual();

        harness.run_iteration(&shutdown).await;
        assert!(harness.sink.rows.is_empty());
    }

    #[tokio::test]
    async fn test_one_result_row_per_enabled_defined_workload() {
        let defs = [bench_def("bench_a"), bench_def("bench_b")];
        let (_dir, mut harness) = test_harness(&["bench_a", "ghost", "bench_b"], &defs, 0);
        let (shutdown, _trigger) = ShutdownSignal::manual();

        harness.run_iteration(&shutdown).await;
        assert_eq!(harness.sink.rows.len(), 2);

        harness.run_iteration(&shutdown).await;
        assert_eq!(harness.sink.rows.len(), 4);
    }

    #[tokio::test]
    async fn test_workload_failure_becomes_a_failed_row() {
        // No persistent environment exists, so the benchmark fails with a
        // setup-missing error and the iteration keeps going.
        let defs = [bench_def("bench_a")];
        let (_dir, mut harness) = test_harness(&["bench_a"], &defs, 0);
        let (shutdown, _trigger) = ShutdownSignal::manual();

        harness.run_iteration(&shutdown).await;

        let row = &harness.sink.rows[0];
        assert_eq!(row.test_name, "bench_a");
        assert_eq!(row.setup_id, "unit");
        assert!(!row.success);
        assert!(row.execution_time_seconds >= 0.0);
        assert!(
            row.error_message
                .as_deref()
                .unwrap()
                .contains("persistent environment missing")
        );
    }

    #[tokio::test]
    async fn test_run_returns_promptly_when_already_triggered() {
        let (_dir, mut harness) = test_harness(&[], &[], 60);
        let (shutdown, trigger) = ShutdownSignal::manual();
        trigger.trigger();

        tokio::time::timeout(Duration::from_secs(1), harness.run(&shutdown))
            .await
            .expect("run should observe the pending shutdown");
    }

    #[tokio::test]
    async fn test_trigger_during_wait_interrupts_the_sleep() {
        let (_dir, mut harness) = test_harness(&[], &[], 600);
        let (shutdown, trigger) = ShutdownSignal::manual();

        let deadline = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(harness.run(&shutdown), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                trigger.trigger();
            })
        });
        deadline.await.expect("shutdown should interrupt the wait");
    }

    #[tokio::test]
    async fn test_shutdown_purges_workspace_and_disconnects_sink() {
        let defs = [bench_def("bench_a")];
        let (_dir, mut harness) = test_harness(&["bench_a"], &defs, 0);

        // Leave both transient and persistent artifacts behind.
        std::fs::create_dir_all(harness.workspace.root().join("test_repo_1_0")).unwrap();
        std::fs::create_dir_all(harness.workspace.root().join("bench_venv_bench_a")).unwrap();
        assert!(harness.sink.is_connected());

        harness.shutdown();

        assert!(!harness.sink.is_connected());
        let leftovers: Vec<_> = std::fs::read_dir(harness.workspace.root())
            .unwrap()
            .collect();
        assert!(leftovers.is_empty(), "workspace should be fully purged");
    }

    #[tokio::test]
    async fn test_iteration_sweeps_transient_artifacts() {
        let (_dir, mut harness) = test_harness(&[], &[], 0);
        let stray = harness.workspace.root().join("test_venv_123_abc");
        std::fs::create_dir_all(&stray).unwrap();

        // One pass through the loop body: iteration, then the sweep.
        let (shutdown, _trigger) = ShutdownSignal::manual();
        harness.run_iteration(&shutdown).await;
        harness.workspace.purge_transient();

        assert!(!stray.exists());
    }
}
