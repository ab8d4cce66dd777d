use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reading from the hardware step counter.
///
/// The counter reports steps since the last device reboot, not since
/// midnight. Only `cumulative_steps_since_boot` is meaningful to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReading {
    pub timestamp: DateTime<Utc>,
    pub cumulative_steps_since_boot: u64,
}

impl StepReading {
    pub fn new(timestamp: DateTime<Utc>, cumulative_steps_since_boot: u64) -> Self {
        Self {
            timestamp,
            cumulative_steps_since_boot,
        }
    }

    /// Reading taken right now.
    pub fn now(cumulative_steps_since_boot: u64) -> Self {
        Self::new(Utc::now(), cumulative_steps_since_boot)
    }

    /// Steps as stored in the ledger (saturating at `i64::MAX`).
    pub fn ledger_steps(&self) -> i64 {
        i64::try_from(self.cumulative_steps_since_boot).unwrap_or(i64::MAX)
    }
}
