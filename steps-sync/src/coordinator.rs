//! Sync coordinator: bounded, single-flight synchronization.
//!
//! One pass uploads pending local changes, downloads remote ones and then
//! refreshes today's calorie goal from the booking source. Steps run strictly
//! in that order; a failing step aborts the rest and nothing is rolled back.
//!
//! ```text
//!          synchronize()
//!               │
//!     no network? ──► NoNetwork
//!               │
//!     background? ──► BackgroundNotPermitted
//!               │
//!       acquire sync token ──► another pass finished meanwhile ──► Joined
//!               │
//!   Idle ──► Syncing (refreshing = true) ──► Idle
//!            ready → upload → download → booking
//! ```
//!
//! The whole pass is bounded by the configured timeout.

use crate::error::{ErrorReporter, SyncError, SyncResult};
use crate::host::HostEnvironment;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use steps_cloud::{BookingSource, RemoteStore};
use steps_metrics::MetricsEngine;
use steps_types::{Clock, Observable};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a [`SyncCoordinator::synchronize`] call ended successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// This call ran a full pass.
    Completed,
    /// Another pass finished while this call waited for the sync token.
    Joined,
    /// A booking was already available locally, no exchange was needed.
    Skipped,
}

/// Snapshot of the coordinator's bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub in_flight: bool,
    pub last_error: Option<SyncError>,
    /// Passes that entered Syncing, successful or not.
    pub completed_runs: u64,
}

/// Sets `refreshing` for as long as it lives.
struct RefreshingGuard<'a> {
    refreshing: &'a Observable<bool>,
}

impl<'a> RefreshingGuard<'a> {
    fn engage(refreshing: &'a Observable<bool>) -> Self {
        refreshing.publish(true);
        Self { refreshing }
    }
}

impl Drop for RefreshingGuard<'_> {
    fn drop(&mut self) {
        self.refreshing.publish(false);
    }
}

/// Reconciles local state with the canteen backend.
pub struct SyncCoordinator {
    remote: Arc<dyn RemoteStore>,
    bookings: Arc<dyn BookingSource>,
    host: Arc<dyn HostEnvironment>,
    metrics: MetricsEngine,
    clock: Arc<dyn Clock>,
    reporter: ErrorReporter,
    timeout: Duration,
    /// Held for the whole pass. Only one pass runs at a time.
    token: TokioMutex<()>,
    /// Written only while `token` is held.
    state: Mutex<SyncState>,
    refreshing: Observable<bool>,
}

impl SyncCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        bookings: Arc<dyn BookingSource>,
        host: Arc<dyn HostEnvironment>,
        metrics: MetricsEngine,
        clock: Arc<dyn Clock>,
        reporter: ErrorReporter,
        timeout: Duration,
    ) -> Self {
        let refreshing = Observable::new();
        refreshing.publish(false);
        Self {
            remote,
            bookings,
            host,
            metrics,
            clock,
            reporter,
            timeout,
            token: TokioMutex::new(()),
            state: Mutex::new(SyncState::default()),
            refreshing,
        }
    }

    /// `true` while a pass is in Syncing.
    pub fn refreshing(&self) -> &Observable<bool> {
        &self.refreshing
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn state(&self) -> SyncState {
        self.lock_state().clone()
    }

    /// Runs one synchronization pass.
    ///
    /// Every failure is also emitted once on the error stream.
    pub async fn synchronize(&self) -> SyncResult<SyncOutcome> {
        if !self.host.is_network_available() {
            self.refreshing.publish(false);
            return Err(self.fail(SyncError::NoNetwork));
        }
        if !self.host.is_in_foreground() {
            return Err(self.fail(SyncError::BackgroundNotPermitted));
        }

        // Taken before waiting so a pass that completes meanwhile is noticed.
        let seen = self.lock_state().completed_runs;
        let _token = self.token.lock().await;
        if self.lock_state().completed_runs > seen {
            debug!("[SYNC] joined a pass that finished while waiting");
            return Ok(SyncOutcome::Joined);
        }

        let run_id = Uuid::now_v7();
        info!("[SYNC] pass {run_id} started");
        let result = {
            let _refreshing = RefreshingGuard::engage(&self.refreshing);
            self.lock_state().in_flight = true;

            let result = match tokio::time::timeout(self.timeout, self.run_pass(run_id)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::TimedOut(self.timeout)),
            };

            let mut state = self.lock_state();
            state.in_flight = false;
            state.completed_runs += 1;
            state.last_error = result.as_ref().err().cloned();
            result
        };

        match result {
            Ok(()) => {
                info!("[SYNC] pass {run_id} completed");
                Ok(SyncOutcome::Completed)
            }
            Err(e) => {
                debug!("[SYNC] pass {run_id} failed");
                Err(self.fail(e))
            }
        }
    }

    /// Fetches today's booking and feeds its calorie goal to the metrics engine.
    pub async fn refresh_booking(&self) -> SyncResult<u32> {
        self.apply_todays_booking().await.map_err(|e| self.fail(e))
    }

    /// Session start: uses a booking already available locally, otherwise
    /// runs one synchronization pass.
    pub async fn synchronize_if_empty(&self) -> SyncResult<SyncOutcome> {
        let today = self.clock.today();
        match self.bookings.fetch_todays_booking(today).await {
            Ok(Some(booking)) => {
                if let Some(goal) = booking.calorie_goal() {
                    info!("[SYNC] using local booking {} for {today}", booking.booking_id);
                    self.metrics.set_calorie_goal(goal);
                    return Ok(SyncOutcome::Skipped);
                }
                debug!("[SYNC] local booking {} has no calorie value", booking.booking_id);
            }
            Ok(None) => debug!("[SYNC] no local booking for {today}"),
            Err(e) => warn!("[SYNC] local booking lookup failed: {e}"),
        }
        self.synchronize().await
    }

    async fn run_pass(&self, run_id: Uuid) -> SyncResult<()> {
        self.remote
            .ready()
            .await
            .map_err(|e| SyncError::StoreNotReady(e.to_string()))?;

        debug!("[SYNC] pass {run_id}: uploading");
        self.remote
            .upload()
            .await
            .map_err(|e| SyncError::UploadFailed(e.to_string()))?;

        debug!("[SYNC] pass {run_id}: downloading");
        self.remote
            .download()
            .await
            .map_err(|e| SyncError::DownloadFailed(e.to_string()))?;

        debug!("[SYNC] pass {run_id}: refreshing booking");
        self.apply_todays_booking().await.map(|_| ())
    }

    async fn apply_todays_booking(&self) -> SyncResult<u32> {
        let today = self.clock.today();
        let booking = self
            .bookings
            .fetch_todays_booking(today)
            .await
            .map_err(|e| SyncError::BookingFetchFailed(e.to_string()))?;

        let goal = booking
            .as_ref()
            .and_then(|b| b.calorie_goal())
            .ok_or(SyncError::NoBookingFound)?;
        info!("[SYNC] calorie goal for {today}: {goal}");
        self.metrics.set_calorie_goal(goal);
        Ok(goal)
    }

    fn fail(&self, err: SyncError) -> SyncError {
        self.reporter.report(&err);
        err
    }

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}
