//! Offline-first booking store.
//!
//! Keeps a session mirror of the booking set (menus expanded) so today's
//! booking can be looked up without a network connection, and queues
//! bookings changed locally until the next upload. The mirror is filled by
//! [`RemoteStore::download`] and lives for the process only; the step ledger
//! is the sole persisted state of the core.
//!
//! The store is usable only after [`OfflineStore::open`] resolved its ready
//! signal.

use crate::api_client::CanteenApiClient;
use crate::error::{CloudError, CloudResult};
use crate::outbox::Outbox;
use crate::source::{BookingSource, RemoteStore};
use crate::types::{Booking, BookingChange, ChangeKind, DateRange};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use steps_types::{ready_signal, Day, ReadyHandle, ReadySignal};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Session mirror of the booking set plus an outbox of local changes.
pub struct OfflineStore {
    api: Arc<CanteenApiClient>,
    mirror: RwLock<Vec<Booking>>,
    outbox: Mutex<Outbox>,
    ready_handle: ReadyHandle,
    ready: ReadySignal,
}

impl OfflineStore {
    pub fn new(api: Arc<CanteenApiClient>) -> Self {
        let (ready_handle, ready) = ready_signal();
        Self {
            api,
            mirror: RwLock::new(Vec::new()),
            outbox: Mutex::new(Outbox::new()),
            ready_handle,
            ready,
        }
    }

    /// Opens the store and resolves its ready signal.
    ///
    /// `initial` seeds the mirror (e.g. bookings handed over by a previous
    /// component); pass an empty vec for a cold start. Booking ids must be
    /// unique, otherwise the store fails to open and stays unusable.
    pub async fn open(&self, initial: Vec<Booking>) -> CloudResult<()> {
        if let Some(dup) = first_duplicate_id(&initial) {
            let reason = format!("duplicate booking id {dup} in seed");
            warn!("offline store failed to open: {reason}");
            self.ready_handle.mark_failed(reason.clone());
            return Err(CloudError::Config(reason));
        }

        let count = initial.len();
        *self.mirror.write().await = initial;
        self.ready_handle.mark_ready();
        info!("offline store opened with {count} bookings");
        Ok(())
    }

    /// Ready signal dependents await before issuing operations.
    pub fn ready_signal(&self) -> ReadySignal {
        self.ready.clone()
    }

    /// Applies a local change to the mirror and queues it for upload.
    pub async fn record_change(&self, change: BookingChange) {
        apply_change(&mut *self.mirror.write().await, &change);
        let mut outbox = self.outbox.lock().await;
        outbox.push(change);
        debug!("queued booking change ({} pending)", outbox.pending_count());
    }

    pub async fn pending_changes(&self) -> usize {
        self.outbox.lock().await.pending_count()
    }

    /// Snapshot of the mirrored bookings.
    pub async fn bookings(&self) -> Vec<Booking> {
        self.mirror.read().await.clone()
    }
}

#[async_trait]
impl RemoteStore for OfflineStore {
    async fn ready(&self) -> CloudResult<()> {
        self.ready
            .wait()
            .await
            .map_err(|e| CloudError::NotOpen(e.to_string()))
    }

    async fn upload(&self) -> CloudResult<()> {
        // The queue is only trimmed once the service accepted the batch, so a
        // cancelled upload loses nothing.
        let batch = self.outbox.lock().await.batch();
        if batch.is_empty() {
            debug!("nothing to upload");
            return Ok(());
        }

        let count = batch.len();
        if let Err(e) = self.api.push_changes(&batch).await {
            warn!("upload of {count} booking changes failed, keeping them queued: {e}");
            return Err(e);
        }
        let acknowledged = self.outbox.lock().await.acknowledge(&batch);
        info!("uploaded {acknowledged} booking changes");
        Ok(())
    }

    async fn download(&self) -> CloudResult<()> {
        let mut bookings = self.api.fetch_booking_set().await?;

        // Changes queued after the last upload stay visible locally.
        let outbox = self.outbox.lock().await;
        for change in outbox.pending() {
            apply_change(&mut bookings, change);
        }
        drop(outbox);

        let count = bookings.len();
        *self.mirror.write().await = bookings;
        info!("downloaded {count} bookings");
        Ok(())
    }
}

#[async_trait]
impl BookingSource for OfflineStore {
    async fn fetch_todays_booking(&self, today: Day) -> CloudResult<Option<Booking>> {
        RemoteStore::ready(self).await?;
        let range = DateRange::day(today);
        let mirror = self.mirror.read().await;
        Ok(mirror
            .iter()
            .find(|b| range.contains(b.booking_date))
            .cloned())
    }
}

fn first_duplicate_id(bookings: &[Booking]) -> Option<String> {
    let mut seen = HashSet::new();
    bookings
        .iter()
        .find(|b| !seen.insert(b.booking_id.as_str()))
        .map(|b| b.booking_id.clone())
}

fn apply_change(bookings: &mut Vec<Booking>, change: &BookingChange) {
    let id = &change.booking.booking_id;
    match change.kind {
        ChangeKind::Upsert => match bookings.iter_mut().find(|b| &b.booking_id == id) {
            Some(existing) => *existing = change.booking.clone(),
            None => bookings.push(change.booking.clone()),
        },
        ChangeKind::Delete => bookings.retain(|b| &b.booking_id != id),
    }
}
