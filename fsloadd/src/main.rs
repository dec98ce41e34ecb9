//! Filesystem load harness daemon.
//!
//! Repeatedly executes configured filesystem workloads (repository clones,
//! environment installs, import benchmarks) against a target path, records
//! one timing row per execution to the result sink, and cleans up after
//! itself, including on termination signals.

#![forbid(unsafe_code)]

mod executor;
mod lifecycle;
mod scheduler;
mod setup;
mod sink;
mod workspace;

use anyhow::Result;
use clap::Parser;
use fsload_common::{HarnessConfig, LogConfig, init_logging};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "fsloadd")]
#[command(author, version, about = "Filesystem load harness daemon")]
struct Cli {
    /// Path to the harness configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log to stdout only, skipping the configured log file
    #[arg(short, long)]
    foreground: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(HarnessConfig::default_path);
    let config = match HarnessConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet; startup failures go to stderr.
            eprintln!("fsloadd: {e}");
            std::process::exit(1);
        }
    };

    let mut log_config = LogConfig::new(&config.log_level);
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    if !cli.foreground {
        log_config = log_config.with_file(&config.log_file);
    }
    let _logging_guards = init_logging(&log_config)?;

    info!(
        "Starting filesystem load harness (setup_id: {}, target: {})",
        config.setup_id,
        config.target_path.display()
    );

    let workspace = workspace::Workspace::new(&config.target_path);
    if let Err(e) = workspace.ensure() {
        error!("Target path not accessible: {e}");
        std::process::exit(1);
    }
    info!("Target path verified: {}", workspace.root().display());
    // Stale artifacts from a previous run are purged before the first
    // iteration; persistent environments are rebuilt by setup anyway.
    workspace.purge_transient();

    let sink = sink::JsonlSink::new(config.sink.path.clone());
    let mut harness = scheduler::Harness::new(config, workspace, sink);
    if let Err(e) = harness.start() {
        error!("Failed to connect result sink: {e}");
        std::process::exit(1);
    }

    let shutdown = lifecycle::ShutdownSignal::install()?;
    harness.run(&shutdown).await;
    harness.shutdown();
    info!("Shutdown complete");
    Ok(())
}
