//! Timestamps for session naming and script timing.

use std::fmt::Display;
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone, Utc};

/// Operator-facing timestamp layout (`yyyy/MM/dd HH:mm:ss`).
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

static PROCESS_START: OnceLock<i64> = OnceLock::new();

/// Epoch milliseconds captured the first time this is called.
///
/// The binary calls it before parsing arguments so the value reflects process
/// start; every later call returns the same instant.
pub fn process_start_millis() -> i64 {
    *PROCESS_START.get_or_init(|| Utc::now().timestamp_millis())
}

/// Render a timestamp with [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Whole seconds between two instants, truncated toward zero.
#[must_use]
pub fn elapsed_seconds<Tz: TimeZone>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> i64 {
    (end.timestamp_millis() - start.timestamp_millis()) / 1000
}
