use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serializer;

/// Serialize an optional duration as fractional seconds (or `null`).
pub fn serialize_optional_secs<S>(
    value: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(duration) => serializer.serialize_f64(round_secs(*duration)),
        None => serializer.serialize_none(),
    }
}

/// Seconds rounded to millisecond precision for display.
pub fn round_secs(duration: Duration) -> f64 {
    (duration.as_millis() as f64) / 1000.0
}

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
