//! Synchronization core for the steps app.
//!
//! Ties the ledger, the metrics engine and the canteen backend together:
//! - [`SyncCoordinator`]: bounded single-flight upload/download/booking refresh
//! - [`ingest`]: sensor stream and periodic one-shot readings into the ledger
//! - [`BackgroundTasks`]: tracked tasks whose failures reach the error stream
//! - [`StepsRepository`]: the facade the UI talks to
//!
//! ```text
//! sensor ──► ingest ──► LedgerStore ──► MetricsEngine ──► UI
//!                                            ▲
//! RemoteStore / BookingSource ◄── SyncCoordinator (calorie goal)
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod ingest;
pub mod repository;
pub mod tasks;

pub use config::{ConfigError, StepsConfig};
pub use coordinator::{SyncCoordinator, SyncOutcome, SyncState};
pub use error::{ErrorCode, ErrorReporter, SyncError, SyncResult};
pub use host::{HostEnvironment, HostFlags};
pub use ingest::{PeriodicTrigger, RefreshCommand, SensorListener, StepSource};
pub use repository::StepsRepository;
pub use tasks::BackgroundTasks;

/// Installs the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Output goes to stderr.
/// Calling it again once a subscriber is installed does nothing.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
