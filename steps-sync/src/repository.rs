//! The facade the UI talks to.

use crate::config::StepsConfig;
use crate::coordinator::{SyncCoordinator, SyncOutcome, SyncState};
use crate::error::{ErrorCode, ErrorReporter, SyncResult};
use crate::host::HostEnvironment;
use crate::ingest::{self, PeriodicTrigger, RefreshCommand, SensorListener, StepSource};
use crate::tasks::BackgroundTasks;
use std::sync::{Arc, Mutex, MutexGuard};
use steps_cloud::{BookingSource, RemoteStore};
use steps_metrics::MetricsEngine;
use steps_storage::LedgerStore;
use steps_types::{Clock, Day, Observable, StepReading};
use tokio::task::JoinHandle;
use tracing::info;

/// Wires ledger, metrics engine and sync coordinator together and exposes
/// the derived values as observables.
pub struct StepsRepository {
    config: StepsConfig,
    ledger: LedgerStore,
    metrics: MetricsEngine,
    coordinator: Arc<SyncCoordinator>,
    reporter: ErrorReporter,
    tasks: Mutex<BackgroundTasks>,
    metrics_pump: JoinHandle<()>,
}

impl StepsRepository {
    /// Opens the ledger at `config.database_path` and starts the repository.
    pub async fn open(
        config: StepsConfig,
        booking_source: Arc<dyn BookingSource>,
        remote_store: Arc<dyn RemoteStore>,
        host: Arc<dyn HostEnvironment>,
        clock: Arc<dyn Clock>,
    ) -> SyncResult<Self> {
        let path = config.database_path.clone();
        let ledger_clock = Arc::clone(&clock);
        let ledger =
            tokio::task::spawn_blocking(move || LedgerStore::open(&path, ledger_clock)).await??;
        info!("opened step ledger at {}", config.database_path.display());
        Ok(Self::start(
            config,
            ledger,
            booking_source,
            remote_store,
            host,
            clock,
        ))
    }

    /// Starts the repository. Must be called from within a Tokio runtime.
    ///
    /// Attaches the metrics engine to the ledger and, in the background,
    /// loads today's calorie goal from a local booking or syncs for one.
    pub fn start(
        config: StepsConfig,
        ledger: LedgerStore,
        booking_source: Arc<dyn BookingSource>,
        remote_store: Arc<dyn RemoteStore>,
        host: Arc<dyn HostEnvironment>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reporter = ErrorReporter::new();
        let metrics = MetricsEngine::new(config.metrics.clone());
        let metrics_pump = metrics.attach(ledger.steps_today());

        let coordinator = Arc::new(SyncCoordinator::new(
            remote_store,
            booking_source,
            host,
            metrics.clone(),
            clock,
            reporter.clone(),
            config.sync_timeout(),
        ));

        let mut tasks = BackgroundTasks::new(reporter.clone());
        let session = Arc::clone(&coordinator);
        tasks.spawn("session-start", async move {
            // Failures were already reported by the coordinator.
            let _ = session.synchronize_if_empty().await;
            Ok(())
        });

        info!("steps repository started");
        Self {
            config,
            ledger,
            metrics,
            coordinator,
            reporter,
            tasks: Mutex::new(tasks),
            metrics_pump,
        }
    }

    // ── Observables ──

    pub fn steps_today(&self) -> &Observable<i64> {
        self.metrics.steps_today()
    }

    pub fn calories_today(&self) -> &Observable<i64> {
        self.metrics.calories_today()
    }

    pub fn calories_remaining(&self) -> &Observable<i64> {
        self.metrics.calories_remaining()
    }

    pub fn refreshing(&self) -> &Observable<bool> {
        self.coordinator.refreshing()
    }

    pub fn errors(&self) -> &Observable<ErrorCode> {
        self.reporter.codes()
    }

    pub fn sync_state(&self) -> SyncState {
        self.coordinator.state()
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    // ── Commands ──

    /// Stores a step counter reading as today's total.
    pub async fn record_steps(&self, cumulative_steps_since_boot: u64) -> SyncResult<Day> {
        let reading = StepReading::now(cumulative_steps_since_boot);
        ingest::record_reading(&self.ledger, reading)
            .await
            .inspect_err(|e| {
                self.reporter.report(e);
            })
    }

    /// Manual refresh: one synchronization pass.
    pub async fn refresh(&self) -> SyncResult<SyncOutcome> {
        self.refresh_command().execute().await
    }

    pub fn refresh_command(&self) -> RefreshCommand {
        RefreshCommand::new(Arc::clone(&self.coordinator))
    }

    /// Re-evaluates the steps-today view, e.g. after midnight.
    pub async fn refresh_day(&self) -> SyncResult<()> {
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || ledger.refresh_view())
            .await??;
        Ok(())
    }

    // ── Ingestion ──

    pub fn sensor_listener(&self) -> SensorListener {
        SensorListener::new(self.ledger.clone(), self.reporter.clone())
    }

    pub fn periodic_trigger(&self) -> PeriodicTrigger {
        PeriodicTrigger::new(
            self.ledger.clone(),
            self.reporter.clone(),
            self.config.periodic_interval(),
        )
    }

    /// Feeds `source` into the ledger as a tracked background task.
    pub fn listen<S: StepSource + 'static>(&self, source: S) {
        let listener = self.sensor_listener();
        self.lock_tasks().spawn("sensor-listener", async move {
            listener.run(source).await.map(|_| ())
        });
    }

    /// Runs the periodic trigger as a tracked background task, one fresh
    /// source from `source_factory` per tick.
    pub fn schedule_periodic<F, S>(&self, source_factory: F)
    where
        F: FnMut() -> S + Send + 'static,
        S: StepSource + 'static,
    {
        let trigger = self.periodic_trigger();
        trigger.spawn(&mut self.lock_tasks(), source_factory);
    }

    /// Stops every background task and the metrics pump.
    pub async fn shutdown(self) {
        self.metrics_pump.abort();
        let mut tasks = self
            .tasks
            .into_inner()
            .unwrap_or_else(|p| p.into_inner());
        tasks.shutdown().await;
        info!("steps repository shut down");
    }

    fn lock_tasks(&self) -> MutexGuard<'_, BackgroundTasks> {
        self.tasks.lock().unwrap_or_else(|p| p.into_inner())
    }
}
