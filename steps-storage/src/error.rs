//! Storage error types.

use steps_types::Day;
use thiserror::Error;

/// Result type for ledger operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing the ledger.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt ledger row: {0}")]
    CorruptRow(#[from] steps_types::DayParseError),

    #[error("negative step total {steps} for {day}")]
    NegativeTotal { day: Day, steps: i64 },
}
