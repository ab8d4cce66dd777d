//! Daily step totals ledger.
//!
//! One row per calendar day with the cumulative step count as of that day.
//! "Steps today" is the difference between today's and yesterday's rows and
//! is republished on [`LedgerStore::steps_today`] after every committed write.

use crate::error::{StorageError, StorageResult};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use steps_types::{Clock, DailyTotal, Day, Observable};
use tracing::{debug, info, warn};

struct Inner {
    conn: Connection,
    /// Bumped on every commit (and view refresh) while the lock is held.
    commits: u64,
}

/// Ledger of daily step totals backed by DuckDB.
///
/// Cloning yields another handle to the same connection and live view.
#[derive(Clone)]
pub struct LedgerStore {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
    steps_today: Observable<Option<i64>>,
}

impl LedgerStore {
    /// Opens or creates a ledger at the given path.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let conn = crate::open_duckdb_with_wal_recovery(path, "64MB", 1)?;
        Self::with_connection(conn, clock)
    }

    /// Opens an in-memory ledger (for testing).
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, clock)
    }

    fn with_connection(conn: Connection, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        initialize_ledger_schema(&conn)?;
        let store = Self {
            inner: Arc::new(Mutex::new(Inner { conn, commits: 0 })),
            clock,
            steps_today: Observable::new(),
        };
        store.refresh_view()?;
        Ok(store)
    }

    /// Live view of `steps_between(yesterday, today)`.
    pub fn steps_today(&self) -> &Observable<Option<i64>> {
        &self.steps_today
    }

    /// Stores the cumulative total for `day`, replacing any existing row.
    ///
    /// When `day` is today and yesterday has no row yet, yesterday is seeded
    /// with the same reading first. The step counter reports steps since
    /// boot, so without that baseline the first day would show the whole
    /// device-lifetime total.
    ///
    /// A negative total is rejected before anything is written.
    pub fn upsert(&self, day: Day, cumulative_steps: i64) -> StorageResult<()> {
        if cumulative_steps < 0 {
            return Err(StorageError::NegativeTotal {
                day,
                steps: cumulative_steps,
            });
        }
        let today = self.clock.today();
        let (generation, view) = {
            let mut inner = self.lock();
            let tx = inner.conn.transaction()?;
            if day == today {
                let yesterday = today.pred();
                if query_total(&tx, yesterday)?.is_none() {
                    insert_row(&tx, yesterday, cumulative_steps)?;
                    info!("seeded baseline for {yesterday}: {cumulative_steps}");
                }
            }
            insert_row(&tx, day, cumulative_steps)?;
            tx.commit()?;

            inner.commits += 1;
            let view = steps_between_in(&inner.conn, today.pred(), today)?;
            (inner.commits, view)
        };
        debug!("updated steps count for {day}: {cumulative_steps}");

        if !self.steps_today.publish_at(generation, view) {
            debug!("skipped stale steps-today view (generation {generation})");
        }
        Ok(())
    }

    /// Upserts a sensor reading for the clock's current day and returns that day.
    pub fn record_today(&self, cumulative_steps: i64) -> StorageResult<Day> {
        let today = self.clock.today();
        self.upsert(today, cumulative_steps)?;
        Ok(today)
    }

    /// Cumulative total stored for `day`.
    pub fn total_as_of(&self, day: Day) -> StorageResult<Option<i64>> {
        let inner = self.lock();
        query_total(&inner.conn, day)
    }

    /// Steps walked between `start` and `end`; both rows must exist.
    ///
    /// `start` must be before `end`. A reversed range is a caller error and
    /// yields the plain (negated) difference.
    pub fn steps_between(&self, start: Day, end: Day) -> StorageResult<Option<i64>> {
        if start >= end {
            warn!("steps_between called with start {start} not before end {end}");
        }
        let inner = self.lock();
        steps_between_in(&inner.conn, start, end)
    }

    /// Re-evaluates the live view without writing, e.g. after midnight.
    pub fn refresh_view(&self) -> StorageResult<()> {
        let today = self.clock.today();
        let (generation, view) = {
            let mut inner = self.lock();
            inner.commits += 1;
            let view = steps_between_in(&inner.conn, today.pred(), today)?;
            (inner.commits, view)
        };
        self.steps_today.publish_at(generation, view);
        Ok(())
    }

    /// Most recent rows, newest first.
    pub fn history(&self, limit: usize) -> StorageResult<Vec<DailyTotal>> {
        let inner = self.lock();
        let mut stmt = inner.conn.prepare(
            "SELECT day, total_steps_to_date FROM daily_steps_total ORDER BY day DESC LIMIT ?",
        )?;
        let rows = stmt
            .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(day, steps)| -> StorageResult<DailyTotal> {
                Ok(DailyTotal::new(day.parse()?, steps))
            })
            .collect()
    }

    /// Number of stored days.
    pub fn row_count(&self) -> StorageResult<u64> {
        let inner = self.lock();
        let count: i64 = inner.conn.query_row(
            "SELECT COUNT(*) FROM daily_steps_total",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("recovering from poisoned ledger mutex");
            poisoned.into_inner()
        })
    }
}

fn query_total(conn: &Connection, day: Day) -> StorageResult<Option<i64>> {
    let result = conn.query_row(
        "SELECT total_steps_to_date FROM daily_steps_total WHERE day = ?",
        params![day.to_string()],
        |row| row.get::<_, i64>(0),
    );

    match result {
        Ok(total) => Ok(Some(total)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn steps_between_in(conn: &Connection, start: Day, end: Day) -> StorageResult<Option<i64>> {
    let Some(end_total) = query_total(conn, end)? else {
        return Ok(None);
    };
    let Some(start_total) = query_total(conn, start)? else {
        return Ok(None);
    };
    Ok(Some(end_total - start_total))
}

fn insert_row(conn: &Connection, day: Day, cumulative_steps: i64) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO daily_steps_total (day, total_steps_to_date) VALUES (?, ?)",
        params![day.to_string(), cumulative_steps],
    )?;
    Ok(())
}

fn initialize_ledger_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS daily_steps_total (
            day VARCHAR PRIMARY KEY,
            total_steps_to_date BIGINT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
