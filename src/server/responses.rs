//! Request and response bodies for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheRead, Freshness};
use crate::error::{CacheError, LookupError};
use crate::services::{AssetView, NetworkView};
use crate::utils::round_secs;

#[derive(Debug, Deserialize)]
pub struct WithdrawFeesRequest {
    #[serde(default)]
    pub coin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BestNetworkRequest {
    #[serde(default)]
    pub coin: Option<String>,
    /// String or number; parsed as a decimal.
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub networks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
}

/// How the served data relates to the cache.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub fetched_at: DateTime<Utc>,
    pub age_seconds: f64,
    pub stale: bool,
    pub freshness: Freshness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_reason: Option<String>,
}

impl CacheMeta {
    pub fn new(read: &CacheRead, now: DateTime<Utc>) -> Self {
        Self {
            fetched_at: read.snapshot.fetched_at(),
            age_seconds: round_secs(read.snapshot.age(now)),
            stale: read.is_stale(),
            freshness: read.freshness,
            stale_reason: read.fallback_reason.as_ref().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    #[serde(flatten)]
    pub asset: AssetView,
    pub cache: CacheMeta,
}

#[derive(Debug, Serialize)]
pub struct AssetListResponse {
    pub count: usize,
    pub assets: Vec<AssetView>,
    pub cache: CacheMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestNetworkResponse {
    pub coin: String,
    pub amount: Decimal,
    pub network: Option<NetworkView>,
    pub no_eligible_network: bool,
    pub cache: CacheMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub asset_count: usize,
    pub cache: CacheMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Errors a handler can return; each maps to one status code.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Lookup(LookupError),
    Cache(CacheError),
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        ApiError::Lookup(err)
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        ApiError::Cache(err)
    }
}

impl ApiError {
    fn parts(self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::Lookup(LookupError::AssetNotFound(coin)) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: format!("Coin {coin} not found in exchange data"),
                    details: None,
                },
            ),
            ApiError::Cache(CacheError::ConfigurationMissing) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody {
                    error: "Exchange API credentials are not configured".to_string(),
                    details: None,
                },
            ),
            ApiError::Cache(CacheError::UpstreamUnavailable(err)) => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    error: "Exchange API error".to_string(),
                    details: Some(err.to_string()),
                },
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        if status.is_server_error() {
            warn!(
                "Responding {status}: {} {}",
                body.error,
                body.details.as_deref().unwrap_or_default()
            );
        }
        (status, Json(body)).into_response()
    }
}
