//! Scripted collaborators for coordinator and repository tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use steps_cloud::{Booking, BookingSource, CloudError, CloudResult, Menu, RemoteStore};
use steps_metrics::MetricsEngine;
use steps_sync::{ErrorReporter, HostFlags, SyncCoordinator};
use steps_types::{Day, FixedClock, Subscription};

pub const SYNC_TIMEOUT: Duration = Duration::from_secs(120);

pub fn today() -> Day {
    Day::from_ymd(2026, 10, 16).unwrap()
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at_noon(today()))
}

pub fn booking(day: Day, kcal: Option<u32>) -> Booking {
    Booking {
        booking_id: format!("booking-{day}"),
        booking_date: day.start() + chrono::Duration::hours(12),
        menu_booked: Some(Menu {
            menu_id: "menu-1".into(),
            kcal_for_main: kcal,
        }),
    }
}

// --- Remote store ---

#[derive(Default)]
pub struct MockRemote {
    pub ready_calls: AtomicUsize,
    pub uploads: AtomicUsize,
    pub downloads: AtomicUsize,
    pub fail_ready: AtomicBool,
    pub fail_upload: AtomicBool,
    pub fail_download: AtomicBool,
    pub hang_upload: AtomicBool,
    pub upload_delay_ms: AtomicU64,
}

impl MockRemote {
    pub fn slow(delay: Duration) -> Self {
        let remote = Self::default();
        remote
            .upload_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
        remote
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn ready(&self) -> CloudResult<()> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ready.load(Ordering::SeqCst) {
            return Err(CloudError::NotOpen("initialization failed".into()));
        }
        Ok(())
    }

    async fn upload(&self) -> CloudResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.hang_upload.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = self.upload_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(CloudError::Api("upload rejected".into()));
        }
        Ok(())
    }

    async fn download(&self) -> CloudResult<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(CloudError::Api("download rejected".into()));
        }
        Ok(())
    }
}

// --- Booking source ---

#[derive(Default)]
pub struct MockBookings {
    pub booking: Mutex<Option<Booking>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockBookings {
    pub fn with_goal(kcal: u32) -> Self {
        let bookings = Self::default();
        bookings.set(Some(booking(today(), Some(kcal))));
        bookings
    }

    pub fn set(&self, booking: Option<Booking>) {
        *self.booking.lock().unwrap() = booking;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingSource for MockBookings {
    async fn fetch_todays_booking(&self, today: Day) -> CloudResult<Option<Booking>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CloudError::Api("booking service unavailable".into()));
        }
        let booking = self.booking.lock().unwrap().clone();
        Ok(booking.filter(|b| Day::new(b.booking_date.date()) == today))
    }
}

// --- Wiring ---

pub struct Harness {
    pub remote: Arc<MockRemote>,
    pub bookings: Arc<MockBookings>,
    pub host: Arc<HostFlags>,
    pub metrics: MetricsEngine,
    pub reporter: ErrorReporter,
    pub coordinator: SyncCoordinator,
}

pub fn harness(remote: MockRemote, bookings: MockBookings) -> Harness {
    harness_with_timeout(remote, bookings, SYNC_TIMEOUT)
}

pub fn harness_with_timeout(
    remote: MockRemote,
    bookings: MockBookings,
    timeout: Duration,
) -> Harness {
    let remote = Arc::new(remote);
    let bookings = Arc::new(bookings);
    let host = Arc::new(HostFlags::default());
    let metrics = MetricsEngine::default();
    let reporter = ErrorReporter::new();
    let coordinator = SyncCoordinator::new(
        remote.clone(),
        bookings.clone(),
        host.clone(),
        metrics.clone(),
        clock(),
        reporter.clone(),
        timeout,
    );
    Harness {
        remote,
        bookings,
        host,
        metrics,
        reporter,
        coordinator,
    }
}

/// Everything currently buffered on a subscription.
pub fn drain<T: Clone>(sub: &mut Subscription<T>) -> Vec<T> {
    let mut values = Vec::new();
    while let Some(v) = sub.try_next() {
        values.push(v);
    }
    values
}

/// Waits until the subscription yields `expected`.
pub async fn wait_for<T: Clone + PartialEq + std::fmt::Debug>(
    sub: &mut Subscription<T>,
    expected: T,
) {
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(v) = sub.next().await {
            if v == expected {
                return true;
            }
        }
        false
    })
    .await;
    assert_eq!(found, Ok(true), "never observed {expected:?}");
}
