//! Timestamp derivation for play events
//!
//! Event timestamps are epoch milliseconds. They are interpreted in UTC,
//! never in the host's local zone, so the same input always lands in the
//! same `year=/month=` partition wherever the job runs.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Timezone attached to every derived `start_time` value
pub const START_TIME_ZONE: &str = "UTC";

/// Calendar fields of a single event timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    /// Exact instant, millisecond precision
    pub start_time: DateTime<Utc>,
    /// Hour of day, 0-23
    pub hour: i32,
    /// Day of month, 1-31
    pub day: i32,
    /// ISO-8601 week number, 1-53
    pub week: i32,
    /// Month, 1-12
    pub month: i32,
    /// Calendar year
    pub year: i32,
    /// Day of week, 1 = Sunday ... 7 = Saturday
    pub weekday: i32,
}

impl TimeParts {
    /// Derive calendar fields from epoch milliseconds.
    ///
    /// Returns `None` when `ts` lies outside the representable range.
    pub fn from_millis(ts: i64) -> Option<Self> {
        let start_time = DateTime::<Utc>::from_timestamp_millis(ts)?;
        Some(Self {
            start_time,
            hour: start_time.hour() as i32,
            day: start_time.day() as i32,
            week: start_time.iso_week().week() as i32,
            month: start_time.month() as i32,
            year: start_time.year(),
            weekday: start_time.weekday().number_from_sunday() as i32,
        })
    }

    /// The instant as epoch milliseconds
    pub fn start_time_millis(&self) -> i64 {
        self.start_time.timestamp_millis()
    }
}
