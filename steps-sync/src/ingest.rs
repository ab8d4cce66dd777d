//! Ingestion adapters: getting step readings into the ledger.
//!
//! Two paths write readings for the current day:
//! - [`SensorListener`] consumes a live stream while the app runs
//! - [`PeriodicTrigger`] takes one fresh reading on a fixed cadence and
//!   stops listening again
//!
//! Ledger writes are blocking DuckDB calls and run on the blocking pool.
//! [`RefreshCommand`] is the UI's manual refresh; it only synchronizes.

use crate::coordinator::{SyncCoordinator, SyncOutcome};
use crate::error::{ErrorReporter, SyncResult};
use crate::tasks::BackgroundTasks;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use steps_storage::LedgerStore;
use steps_types::{Day, StepReading};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// A stream of step counter readings.
#[async_trait]
pub trait StepSource: Send {
    /// Next reading, `None` once the source is closed.
    async fn next_reading(&mut self) -> Option<StepReading>;
}

#[async_trait]
impl StepSource for mpsc::Receiver<StepReading> {
    async fn next_reading(&mut self) -> Option<StepReading> {
        self.recv().await
    }
}

/// Writes `reading` as today's total.
pub async fn record_reading(ledger: &LedgerStore, reading: StepReading) -> SyncResult<Day> {
    let ledger = ledger.clone();
    let steps = reading.ledger_steps();
    let day = tokio::task::spawn_blocking(move || ledger.record_today(steps)).await??;
    debug!("recorded {steps} steps for {day}");
    Ok(day)
}

/// Live sensor stream into the ledger.
#[derive(Clone)]
pub struct SensorListener {
    ledger: LedgerStore,
    reporter: ErrorReporter,
}

impl SensorListener {
    pub fn new(ledger: LedgerStore, reporter: ErrorReporter) -> Self {
        Self { ledger, reporter }
    }

    /// Records every reading until the source closes and returns how many
    /// were stored. A failed write is reported and the stream continues.
    pub async fn run<S: StepSource>(&self, mut source: S) -> SyncResult<u64> {
        info!("sensor listener started");
        let mut stored = 0;
        while let Some(reading) = source.next_reading().await {
            match record_reading(&self.ledger, reading).await {
                Ok(_) => stored += 1,
                Err(e) => {
                    self.reporter.report(&e);
                }
            }
        }
        info!("sensor listener stopped after {stored} readings");
        Ok(stored)
    }
}

/// One-shot reading on a fixed cadence.
#[derive(Clone)]
pub struct PeriodicTrigger {
    ledger: LedgerStore,
    reporter: ErrorReporter,
    interval: Duration,
}

impl PeriodicTrigger {
    pub fn new(ledger: LedgerStore, reporter: ErrorReporter, interval: Duration) -> Self {
        Self {
            ledger,
            reporter,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Takes one reading from `source`, stores it and stops listening.
    ///
    /// Returns the day written, `None` if the source closed without a reading.
    pub async fn run_once<S: StepSource>(&self, mut source: S) -> SyncResult<Option<Day>> {
        let Some(reading) = source.next_reading().await else {
            debug!("periodic trigger: source closed without a reading");
            return Ok(None);
        };
        drop(source);
        record_reading(&self.ledger, reading).await.map(Some)
    }

    /// Runs [`run_once`](Self::run_once) every interval with a fresh source,
    /// starting immediately. Failures are reported and the cadence continues.
    pub async fn run<F, S>(self, mut source_factory: F) -> SyncResult<()>
    where
        F: FnMut() -> S + Send,
        S: StepSource,
    {
        info!("periodic trigger started, every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(source_factory()).await {
                self.reporter.report(&e);
            }
        }
    }

    /// Starts [`run`](Self::run) as a tracked task in `tasks`.
    pub fn spawn<F, S>(self, tasks: &mut BackgroundTasks, source_factory: F)
    where
        F: FnMut() -> S + Send + 'static,
        S: StepSource + 'static,
    {
        tasks.spawn("periodic-trigger", self.run(source_factory));
    }
}

/// Manual refresh issued by the UI.
#[derive(Clone)]
pub struct RefreshCommand {
    coordinator: Arc<SyncCoordinator>,
}

impl RefreshCommand {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Runs a synchronization pass. Step totals are left alone.
    pub async fn execute(&self) -> SyncResult<SyncOutcome> {
        self.coordinator.synchronize().await
    }
}
