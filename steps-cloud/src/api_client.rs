//! HTTP client for the canteen booking service.
//!
//! Speaks a small OData subset: filtered, expanded reads of the booking set
//! and a JSON batch endpoint for uploading locally made changes. Session
//! establishment is someone else's job; an existing bearer token may be
//! passed in through the config.

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::source::BookingSource;
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use std::time::Duration;
use steps_types::Day;
use tracing::debug;

/// Navigation property linking a booking to its menu.
const MENU_NAVIGATION: &str = "menuBooked";

/// HTTP client for the canteen service.
pub struct CanteenApiClient {
    client: Client,
    config: CloudConfig,
}

#[derive(Serialize)]
struct ChangeBatch<'a> {
    changes: &'a [BookingChange],
}

impl CanteenApiClient {
    pub fn new(config: CloudConfig) -> CloudResult<Self> {
        reqwest::Url::parse(&config.api_base_url)
            .map_err(|e| CloudError::Config(format!("api_base_url: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CloudError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    // ── Bookings ──

    /// Bookings whose date falls in `range`, menus expanded.
    pub async fn query_bookings(&self, range: &DateRange) -> CloudResult<Vec<Booking>> {
        let filter = range.to_filter("bookingDate");
        debug!("querying {} with $filter={filter}", self.config.booking_entity_set);

        let resp = self
            .get(&self.config.booking_entity_set)
            .query(&[("$filter", filter.as_str()), ("$expand", MENU_NAVIGATION)])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| CloudError::Api(e.to_string()))?;

        let data: ODataCollection<Booking> = resp.json().await?;
        Ok(data.value)
    }

    /// The full booking set, menus expanded. Used to refresh the offline mirror.
    pub async fn fetch_booking_set(&self) -> CloudResult<Vec<Booking>> {
        let resp = self
            .get(&self.config.booking_entity_set)
            .query(&[("$expand", MENU_NAVIGATION)])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| CloudError::Api(e.to_string()))?;

        let data: ODataCollection<Booking> = resp.json().await?;
        Ok(data.value)
    }

    // ── Changes ──

    /// Uploads locally made booking changes in one batch.
    pub async fn push_changes(&self, changes: &[BookingChange]) -> CloudResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        debug!("uploading {} booking changes", changes.len());

        self.post("$batch")
            .json(&ChangeBatch { changes })
            .send()
            .await?
            .error_for_status()
            .map_err(|e| CloudError::Api(e.to_string()))?;
        Ok(())
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.url(path)))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl BookingSource for CanteenApiClient {
    async fn fetch_todays_booking(&self, today: Day) -> CloudResult<Option<Booking>> {
        let bookings = self.query_bookings(&DateRange::day(today)).await?;
        Ok(bookings.into_iter().next())
    }
}
