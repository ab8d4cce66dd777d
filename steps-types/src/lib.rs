//! Shared vocabulary for the steps core.
//!
//! Everything here is dependency-light so that the storage, metrics, cloud
//! and sync crates can agree on the same types:
//!
//! - [`Day`] and [`DailyTotal`] for the ledger
//! - [`StepReading`] as delivered by the hardware step counter
//! - [`Clock`] so "today" can be pinned in tests
//! - [`Observable`], a last-value caching multicast stream
//! - [`ReadySignal`] for two-phase initialization between components

mod clock;
mod day;
mod observable;
mod ready;
mod reading;

pub use clock::{Clock, FixedClock, SystemClock};
pub use day::{DailyTotal, Day, DayParseError};
pub use observable::{Observable, Subscription, Versioned};
pub use ready::{ready_signal, NotReady, ReadyHandle, ReadySignal};
pub use reading::StepReading;
