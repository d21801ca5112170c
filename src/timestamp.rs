//! POSIX timestamp helpers
//!
//! Plain functions over unix seconds; all readable forms are UTC.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::{Result, StoreError};

/// Format used by `to_readable` / `from_readable`
pub const READABLE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Current time in unix seconds
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// `timestamp` shifted by `duration`
pub fn add_duration(timestamp: i64, duration: Duration) -> i64 {
    timestamp + duration.num_seconds()
}

/// `DD/MM/YYYY HH:MM`
pub fn to_readable(timestamp: i64) -> Result<String> {
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| StoreError::Config(format!("timestamp out of range: {}", timestamp)))?;
    Ok(datetime.format(READABLE_FORMAT).to_string())
}

/// Inverse of `to_readable` (minute precision)
pub fn from_readable(readable: &str) -> Result<i64> {
    NaiveDateTime::parse_from_str(readable, READABLE_FORMAT)
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|e| StoreError::Config(format!("bad timestamp {:?}: {}", readable, e)))
}
