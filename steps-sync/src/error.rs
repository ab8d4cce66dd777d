//! Sync error types and the UI error stream.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use steps_types::Observable;
use thiserror::Error;
use tracing::{error, info, warn};

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while ingesting steps or synchronizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no network connection")]
    NoNetwork,

    #[error("synchronization is not permitted while in background")]
    BackgroundNotPermitted,

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("booking fetch failed: {0}")]
    BookingFetchFailed(String),

    #[error("no booking found for today")]
    NoBookingFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("synchronization timed out after {0:?}")]
    TimedOut(Duration),

    #[error("remote store not ready: {0}")]
    StoreNotReady(String),

    #[error("background task failed: {0}")]
    TaskFailed(String),
}

/// Error codes surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NoNetwork,
    BackgroundNotPermitted,
    SyncFailed,
    NoBookingsFound,
    StorageFailure,
    SyncTimedOut,
}

impl SyncError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoNetwork => ErrorCode::NoNetwork,
            Self::BackgroundNotPermitted => ErrorCode::BackgroundNotPermitted,
            Self::UploadFailed(_)
            | Self::DownloadFailed(_)
            | Self::StoreNotReady(_)
            | Self::TaskFailed(_) => ErrorCode::SyncFailed,
            Self::BookingFetchFailed(_) | Self::NoBookingFound => ErrorCode::NoBookingsFound,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::TimedOut(_) => ErrorCode::SyncTimedOut,
        }
    }
}

impl From<steps_storage::StorageError> for SyncError {
    fn from(e: steps_storage::StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::TaskFailed(e.to_string())
    }
}

/// Publishes failures on the UI error stream, one code per failure.
#[derive(Clone, Default)]
pub struct ErrorReporter {
    codes: Observable<ErrorCode>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The error stream. Late subscribers get the most recent code.
    pub fn codes(&self) -> &Observable<ErrorCode> {
        &self.codes
    }

    /// Logs `err` at its severity and emits its code.
    pub fn report(&self, err: &SyncError) -> ErrorCode {
        match err {
            SyncError::NoBookingFound | SyncError::BackgroundNotPermitted => info!("{err}"),
            SyncError::Storage(_) | SyncError::TaskFailed(_) => error!("{err}"),
            _ => warn!("{err}"),
        }
        let code = err.code();
        self.codes.publish(code);
        code
    }
}
