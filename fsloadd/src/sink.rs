//! Result sink: durable recording of one row per workload execution.
//!
//! The harness only depends on the narrow [`ResultSink`] contract; the
//! shipped implementation appends JSON lines to a local file. A write
//! failure is reported to the caller, logged there, and the row is dropped
//! (acceptable-loss, not at-least-once delivery).

use fsload_common::SinkError;
use fsload_common::types::TestResult;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Narrow contract the harness uses to persist outcomes.
///
/// One row per workload execution with the reference field set
/// `setup_id, test_name, start_time, execution_time_seconds, success,
/// error_message`; `error_message` is nullable and `start_time` is an
/// RFC 3339 UTC timestamp. Any backing store must preserve those
/// semantics.
pub trait ResultSink {
    fn connect(&mut self) -> Result<(), SinkError>;
    fn record(&mut self, result: &TestResult) -> Result<(), SinkError>;
    fn disconnect(&mut self) -> Result<(), SinkError>;
    fn is_connected(&self) -> bool;
}

/// Appends result rows to a JSONL file, one JSON object per line.
pub struct JsonlSink {
    path: PathBuf,
    file: Option<File>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }
}

impl ResultSink for JsonlSink {
    fn connect(&mut self) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.file = Some(file);
        info!("Result sink connected: {}", self.path.display());
        Ok(())
    }

    fn record(&mut self, result: &TestResult) -> Result<(), SinkError> {
        let Some(file) = self.file.as_mut() else {
            return Err(SinkError::NotConnected);
        };
        let row = serde_json::to_string(result)?;
        writeln!(file, "{row}")?;
        debug!(
            "Logged test result: {}/{}, {:.2}s",
            result.setup_id, result.test_name, result.execution_time_seconds
        );
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SinkError> {
        if self.file.take().is_some() {
            info!("Result sink disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_result(test_name: &str, success: bool) -> TestResult {
        TestResult {
            setup_id: "unit".to_string(),
            test_name: test_name.to_string(),
            start_time: Utc::now(),
            execution_time_seconds: 0.5,
            success,
            error_message: (!success).then(|| "clone: exit status 128".to_string()),
        }
    }

    #[test]
    fn test_record_before_connect_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::new(dir.path().join("results.jsonl"));

        let err = sink.record(&sample_result("clone_test", true)).unwrap_err();
        assert!(matches!(err, SinkError::NotConnected));
        assert!(!sink.is_connected());
    }

    #[test]
    fn test_record_appends_one_parseable_row_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let mut sink = JsonlSink::new(&path);
        sink.connect().unwrap();
        assert!(sink.is_connected());

        sink.record(&sample_result("clone_test", true)).unwrap();
        sink.record(&sample_result("clone_test", false)).unwrap();
        sink.disconnect().unwrap();
        assert!(!sink.is_connected());

        let raw = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<TestResult> = raw
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].success);
        assert_eq!(rows[0].error_message, None);
        assert_eq!(
            rows[1].error_message.as_deref(),
            Some("clone: exit status 128")
        );
    }

    #[test]
    fn test_connect_appends_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        for _ in 0..2 {
            let mut sink = JsonlSink::new(&path);
            sink.connect().unwrap();
            sink.record(&sample_result("clone_test", true)).unwrap();
            sink.disconnect().unwrap();
        }

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[test]
    fn test_connect_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("results.jsonl");
        let mut sink = JsonlSink::new(&path);
        sink.connect().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_disconnect_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonlSink::new(dir.path().join("results.jsonl"));
        sink.connect().unwrap();
        sink.disconnect().unwrap();
        sink.disconnect().unwrap();
    }
}
