//! Fixtures shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::Notify;

use crate::error::UpstreamError;
use crate::fetch::{Credentials, FetchResult, UpstreamClient};
use crate::records::{AssetRecord, NetworkRecord, RawDataset};

/// Fixed base instant offset by `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub fn network(id: &str, fee: &str, min: &str, withdraw_enabled: bool) -> NetworkRecord {
    NetworkRecord {
        network: id.to_string(),
        name: None,
        withdraw_fee: dec(fee),
        withdraw_min: dec(min),
        deposit_enabled: true,
        withdraw_enabled,
    }
}

pub fn sample_dataset() -> RawDataset {
    vec![
        AssetRecord {
            coin: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            networks: vec![
                network("BTC", "0.0002", "0.001", true),
                network("BSC", "0.0000042", "0.0000098", true),
                network("LIGHTNING", "0.000001", "0.00002", true),
            ],
        },
        AssetRecord {
            coin: "USDT".to_string(),
            name: "TetherUS".to_string(),
            networks: vec![
                network("BSC", "0.5", "10", true),
                network("TRX", "0.1", "100", true),
                network("ETH", "2", "20", true),
                network("SOL", "0.05", "1", false),
                network("OPBNB", "0.01", "1", true),
            ],
        },
        AssetRecord {
            coin: "XDOGE".to_string(),
            name: "Experimental".to_string(),
            networks: vec![network("OPBNB", "1", "1", true)],
        },
    ]
}

/// Upstream double whose behaviour is toggled through atomics.
pub struct ScriptedUpstream {
    pub calls: AtomicUsize,
    pub failing: AtomicBool,
    pub hold: AtomicBool,
    pub panicking: AtomicBool,
    gate: Notify,
    delay: Duration,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            panicking: AtomicBool::new(false),
            gate: Notify::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Let one held fetch proceed.
    pub fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }
}

#[async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn fetch_raw(
        &self,
        _credentials: &Credentials,
        _now: DateTime<Utc>,
    ) -> FetchResult<RawDataset> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.hold.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panicking.load(Ordering::SeqCst) {
            panic!("scripted upstream panic");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(UpstreamError::Status {
                status: 503,
                detail: "system maintenance".to_string(),
            });
        }

        Ok(sample_dataset())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
