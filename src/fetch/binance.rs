use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;

use crate::error::{Context, Result, UpstreamError};
use crate::records::RawDataset;

use super::auth::{signed_query, Credentials, DEFAULT_RECV_WINDOW_MS};
use super::decode::decode_dataset;
use super::{FetchResult, UpstreamClient};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const CONFIG_GETALL_PATH: &str = "/sapi/v1/capital/config/getall";
const API_KEY_HEADER: &str = "X-MBX-APIKEY";
const MAX_ERROR_DETAIL: usize = 512;

/// Signed client for the exchange's asset configuration endpoint.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fee-proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to construct HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn endpoint(&self, credentials: &Credentials, now: DateTime<Utc>) -> FetchResult<String> {
        let query = signed_query(credentials, now, DEFAULT_RECV_WINDOW_MS)
            .map_err(|err| UpstreamError::Transport(format!("failed to sign request: {err}")))?;
        Ok(format!("{}{}?{}", self.base_url, CONFIG_GETALL_PATH, query))
    }

    fn map_send_error(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::from(err)
        }
    }
}

#[async_trait]
impl UpstreamClient for BinanceClient {
    async fn fetch_raw(
        &self,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> FetchResult<RawDataset> {
        debug!("Requesting {}{}", self.base_url, CONFIG_GETALL_PATH);

        let response = self
            .client
            .get(self.endpoint(credentials, now)?)
            .header(API_KEY_HEADER, &credentials.api_key)
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Exchange returned {status}: {detail}");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                detail: truncate(&detail, MAX_ERROR_DETAIL),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| self.map_send_error(err))?;
        let dataset = decode_dataset(&body)?;

        info!("Fetched withdraw configuration for {} assets", dataset.len());
        Ok(dataset)
    }

    fn name(&self) -> &str {
        "binance"
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
