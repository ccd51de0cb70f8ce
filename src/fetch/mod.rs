use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::UpstreamError;
use crate::records::RawDataset;

pub mod auth;
pub mod binance;
pub mod decode;

pub use auth::Credentials;
pub use binance::BinanceClient;

pub type FetchResult<T> = std::result::Result<T, UpstreamError>;

/// Source of the raw withdraw-fee dataset.
///
/// Implementations issue exactly one authenticated request per call, apply
/// their own timeout, and are safe to retry.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch_raw(
        &self,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> FetchResult<RawDataset>;

    fn name(&self) -> &str;
}
