use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// One network an asset can be withdrawn over, normalized from the exchange payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub network: String,
    pub name: Option<String>,
    pub withdraw_fee: Decimal,
    pub withdraw_min: Decimal,
    pub deposit_enabled: bool,
    pub withdraw_enabled: bool,
}

/// Per-asset entry of the exchange dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub coin: String,
    pub name: String,
    pub networks: Vec<NetworkRecord>,
}

/// Ordered dataset as returned by the upstream client.
pub type RawDataset = Vec<AssetRecord>;

/// Immutable copy of the full dataset plus the instant it was fetched.
#[derive(Debug, Clone)]
pub struct Snapshot {
    assets: Arc<RawDataset>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(assets: RawDataset, fetched_at: DateTime<Utc>) -> Self {
        Self {
            assets: Arc::new(assets),
            fetched_at,
        }
    }

    pub fn assets(&self) -> &[AssetRecord] {
        &self.assets
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Age relative to `now`, clamped at zero when the clock moved backwards.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) < window
    }
}
