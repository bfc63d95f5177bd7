//! HTTP client for the activity collector
//!
//! One synchronous-looking request per batch: serialize the events plus the
//! counters snapshot and POST them to `/api/activity`. This is a pure,
//! single-attempt transport - retry policy lives with the sender loop, which
//! requeues the batch's events on any failure.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::types::{CounterSnapshot, Event, SystemInfo};

use super::batch::Batch;

/// HTTP client for the collector's activity endpoint
pub struct CollectorClient {
    http_client: reqwest::Client,
    base_url: String,
    system_info: SystemInfo,
}

impl CollectorClient {
    /// Create a new client from configuration and the startup identity
    pub fn new(config: &TrackerConfig, system_info: SystemInfo) -> Result<Self> {
        config.validate()?;

        let base_url = config.server_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // A finite timeout: an unbounded hang here would stall all delivery.
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            system_info,
        })
    }

    /// Attempt delivery of one batch
    ///
    /// Fails on connection errors, timeouts, and any non-2xx response.
    /// Never retries internally.
    pub async fn send(&self, batch: &Batch) -> Result<()> {
        let url = format!("{}/api/activity", self.base_url);

        let payload = ActivityPayload {
            system_info: &self.system_info,
            timestamp: Utc::now(),
            events: &batch.events,
            summary: &batch.summary,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Delivery(format!(
                "collector returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// Request body for POST /api/activity
#[derive(Serialize)]
struct ActivityPayload<'a> {
    system_info: &'a SystemInfo,
    /// Instant of the send attempt
    timestamp: DateTime<Utc>,
    events: &'a [Event],
    summary: &'a CounterSnapshot,
}
