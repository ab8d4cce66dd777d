//! Calendar days and the per-day ledger row.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Format used to persist and display days.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day, the unique key of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Day(NaiveDate);

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Builds a day from its components, `None` for impossible dates.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The day before this one.
    pub fn pred(&self) -> Self {
        self.0.pred_opt().map(Self).unwrap_or(*self)
    }

    /// The day after this one.
    pub fn succ(&self) -> Self {
        self.0.succ_opt().map(Self).unwrap_or(*self)
    }

    /// Midnight at the start of this day.
    pub fn start(&self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }
}

impl From<NaiveDate> for Day {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

/// Error returned when a day string is not `YYYY-MM-DD`.
#[derive(Debug, Error)]
#[error("invalid day '{input}': {source}")]
pub struct DayParseError {
    input: String,
    #[source]
    source: chrono::ParseError,
}

impl FromStr for Day {
    type Err = DayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DAY_FORMAT)
            .map(Self)
            .map_err(|source| DayParseError {
                input: s.to_string(),
                source,
            })
    }
}

/// Total number of steps walked up to and including `day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub day: Day,
    pub cumulative_steps: i64,
}

impl DailyTotal {
    pub fn new(day: Day, cumulative_steps: i64) -> Self {
        Self {
            day,
            cumulative_steps,
        }
    }
}
