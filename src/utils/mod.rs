pub mod time;

pub use time::{format_timestamp, round_secs, serialize_optional_secs};
