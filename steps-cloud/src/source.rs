//! Seams between the sync coordinator and the remote side.

use crate::error::CloudResult;
use crate::types::Booking;
use async_trait::async_trait;
use steps_types::Day;

/// Looks up the booking for a calendar day.
#[async_trait]
pub trait BookingSource: Send + Sync {
    /// Returns today's booking with its menu expanded.
    ///
    /// `Ok(None)` means the query succeeded but found nothing; `Err` means the
    /// lookup itself failed.
    async fn fetch_todays_booking(&self, today: Day) -> CloudResult<Option<Booking>>;
}

/// Bidirectional reconciliation with the backend.
///
/// The wire format is the implementation's business; callers only sequence
/// the calls and react to failures.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Resolves once the store is open and usable.
    async fn ready(&self) -> CloudResult<()>;

    /// Sends all pending local changes to the backend.
    async fn upload(&self) -> CloudResult<()>;

    /// Pulls remote changes into the local side.
    async fn download(&self) -> CloudResult<()>;
}
