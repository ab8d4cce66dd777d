//! DuckDB storage layer for the steps core.
//!
//! Persists one row per calendar day holding the cumulative step count as of
//! that day. This is the only persisted state of the core; everything else
//! (calorie goal, sync state) is rebuilt per session.
//!
//! # Architecture
//!
//! - A single `daily_steps_total` table keyed by day, written with
//!   `INSERT OR REPLACE`
//! - One connection behind a mutex, so keyed upserts are serialized
//! - A live "steps today" view republished after every committed write

mod error;
mod ledger;

pub use error::{StorageError, StorageResult};
pub use ledger::LedgerStore;

use tracing::warn;

/// Open a DuckDB connection with stale WAL recovery and resource limits.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once. This handles the common case
/// where the process was killed mid-write and the WAL prevents reopening.
///
/// `memory_limit` and `threads` cap per-database resource usage.
pub fn open_duckdb_with_wal_recovery(
    path: &std::path::Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<duckdb::Connection> {
    let conn = match duckdb::Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                warn!(
                    "DuckDB open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    let c = duckdb::Connection::open(path)?;
                    apply_resource_limits(&c, memory_limit, threads)?;
                    return Ok(c);
                }
            }
            return Err(first_err.into());
        }
    };
    apply_resource_limits(&conn, memory_limit, threads)?;
    Ok(conn)
}

/// Apply memory and thread limits to a DuckDB connection.
fn apply_resource_limits(
    conn: &duckdb::Connection,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{}'; PRAGMA threads={};",
        memory_limit, threads
    ))?;
    Ok(())
}
