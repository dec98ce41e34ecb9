//! Shared types and utilities for the filesystem load harness.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use config::{HarnessConfig, SinkConfig};
pub use errors::{ConfigError, SetupError, SinkError, WorkloadError, WorkspaceError};
pub use logging::{LogConfig, init_logging};
pub use types::{TestResult, WorkloadDefinition, WorkloadKind};
