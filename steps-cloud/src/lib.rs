//! Remote side of the steps core.
//!
//! Provides the canteen backend integration:
//! - API client for the booking service (today's booking, booking set, change upload)
//! - Offline-first store that mirrors bookings for the session and queues local changes
//! - The [`BookingSource`] and [`RemoteStore`] seams used by the sync coordinator

pub mod api_client;
pub mod config;
pub mod error;
pub mod offline_store;
pub mod outbox;
pub mod source;
pub mod types;

pub use api_client::CanteenApiClient;
pub use config::CloudConfig;
pub use error::{CloudError, CloudResult};
pub use offline_store::OfflineStore;
pub use source::{BookingSource, RemoteStore};
pub use types::*;
