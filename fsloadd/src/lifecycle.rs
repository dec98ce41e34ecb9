//! Termination-signal handling for the harness lifecycle.
//!
//! Signal listeners are owned by the harness instance rather than
//! registered as process-global free functions. Delivery is asynchronous;
//! the scheduler observes it at the next safe point (between workloads or
//! during the inter-iteration wait) and hands control back for teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::info;

/// Records that a termination signal has been observed.
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
    _listener: Option<tokio::task::JoinHandle<()>>,
}

/// Handle for requesting shutdown programmatically in tests.
#[cfg(test)]
#[derive(Clone)]
pub struct ShutdownTrigger {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

#[cfg(test)]
impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

impl ShutdownSignal {
    /// Install SIGTERM/SIGINT listeners. Must run inside the tokio runtime.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let triggered = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let task_triggered = triggered.clone();
        let task_notify = notify.clone();
        let listener = tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, stopping test loop"),
                _ = sigint.recv() => info!("Received interrupt signal, stopping test loop"),
            }
            task_triggered.store(true, Ordering::SeqCst);
            task_notify.notify_waiters();
        });

        Ok(Self {
            triggered,
            notify,
            _listener: Some(listener),
        })
    }

    /// Ctrl-C only fallback for platforms without unix signal streams.
    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        let triggered = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let task_triggered = triggered.clone();
        let task_notify = notify.clone();
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received interrupt signal, stopping test loop");
            }
            task_triggered.store(true, Ordering::SeqCst);
            task_notify.notify_waiters();
        });

        Ok(Self {
            triggered,
            notify,
            _listener: Some(listener),
        })
    }

    /// A signal source driven by a [`ShutdownTrigger`] instead of process
    /// signals.
    #[cfg(test)]
    pub fn manual() -> (Self, ShutdownTrigger) {
        let triggered = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let signal = Self {
            triggered: triggered.clone(),
            notify: notify.clone(),
            _listener: None,
        };
        (signal, ShutdownTrigger { triggered, notify })
    }

    /// True once a termination request has been observed.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait until a termination request arrives.
    pub async fn recv(&self) {
        let notified = self.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}
