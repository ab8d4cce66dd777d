//! Shared test helpers for canteen service tests.

use steps_cloud::{CanteenApiClient, CloudConfig};
use steps_types::Day;
use wiremock::MockServer;

pub fn today() -> Day {
    Day::from_ymd(2026, 10, 16).unwrap()
}

/// API client pointing at the mock server.
pub fn client_for(server: &MockServer) -> CanteenApiClient {
    CanteenApiClient::new(CloudConfig::local(server.uri())).expect("client must build")
}

/// A booking as the service serializes it, menu expanded.
pub fn booking_json(id: &str, date: &str, kcal: Option<u32>) -> serde_json::Value {
    serde_json::json!({
        "bookingId": id,
        "bookingDate": date,
        "menuBooked": {
            "menuId": format!("menu-{id}"),
            "kcalForMain": kcal,
        }
    })
}

pub fn collection(items: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "value": items })
}
