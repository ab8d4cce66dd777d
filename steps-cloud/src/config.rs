//! Canteen backend configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the canteen booking service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL of the canteen service (e.g., "https://canteen.example.com/odata").
    pub api_base_url: String,

    /// Entity set holding bookings.
    pub booking_entity_set: String,

    /// Bearer token from an already established session, if the service needs one.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://canteen.example.com/odata".to_string(),
            booking_entity_set: "BookingSet".to_string(),
            api_token: None,
            request_timeout_secs: 30,
        }
    }
}

impl CloudConfig {
    /// Config pointing at a local test server.
    pub fn local(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            request_timeout_secs: 5,
            ..Self::default()
        }
    }
}
