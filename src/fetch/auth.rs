use std::fmt::Debug;

use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default `recvWindow` sent with signed requests, in milliseconds.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;

/// API key pair used to sign exchange requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask(&self.api_key))
            .finish_non_exhaustive()
    }
}

fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{visible}***")
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Hex-encoded signature of a query string.
pub fn sign_query(secret: &str, query: &str) -> Result<String, InvalidLength> {
    hmac_sha256(secret.as_bytes(), query.as_bytes()).map(hex::encode)
}

/// Build the full signed query for a request issued at `now`.
pub fn signed_query(
    credentials: &Credentials,
    now: DateTime<Utc>,
    recv_window_ms: u64,
) -> Result<String, InvalidLength> {
    let query = format!(
        "timestamp={}&recvWindow={}",
        now.timestamp_millis(),
        recv_window_ms
    );
    let signature = sign_query(&credentials.api_secret, &query)?;
    Ok(format!("{query}&signature={signature}"))
}
