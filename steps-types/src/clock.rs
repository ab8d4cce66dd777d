//! Wall clock abstraction. "Today" is always evaluated at call time.

use crate::Day;
use chrono::{DateTime, Duration, Local, Utc};
use std::sync::Mutex;

/// Source of the current time and calendar day.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> Day;

    fn yesterday(&self) -> Day {
        self.today().pred()
    }
}

/// Clock backed by the system time; days follow the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> Day {
        Day::new(Local::now().date_naive())
    }
}

/// Settable clock for tests and simulations. Days follow UTC.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to noon of `day`.
    pub fn at_noon(day: Day) -> Self {
        Self::new(day.start().and_utc() + Duration::hours(12))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn today(&self) -> Day {
        Day::new(self.now().date_naive())
    }
}
