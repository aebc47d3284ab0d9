//! Play-event shaping: the NextSong filter, time columns, users and time

use super::time::{TimeParts, START_TIME_ZONE};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::{col, NEXT_SONG_PAGE};
use arrow::array::{Array, ArrayRef, Int32Array, Int64Array, TimestampMillisecondArray};
use arrow::error::ArrowError;
use std::sync::Arc;

/// Columns of the users table
pub const USER_COLUMNS: [&str; 5] = [
    col::USER_ID,
    col::FIRST_NAME,
    col::LAST_NAME,
    col::GENDER,
    col::LEVEL,
];

/// Columns of the time table
pub const TIME_COLUMNS: [&str; 7] = [
    col::START_TIME,
    col::HOUR,
    col::DAY,
    col::WEEK,
    col::MONTH,
    col::YEAR,
    col::WEEKDAY,
];

/// Keep only events that represent an actual play
pub async fn next_song_events(log_data: &Dataset) -> Result<Dataset> {
    log_data.filter_eq(col::PAGE, NEXT_SONG_PAGE).await
}

/// One row per distinct `userId`.
///
/// No ordering is applied first, so for users seen with several levels the
/// surviving `level` is simply the one on their earliest row in input order.
pub async fn users_table(next_song: &Dataset) -> Result<Dataset> {
    next_song
        .project(&USER_COLUMNS)
        .await?
        .dedup_by(&[col::USER_ID])
        .await
}

/// Append `start_time` and its calendar fields derived from `ts`
pub fn with_time_columns(events: &Dataset) -> Result<Dataset> {
    let ts = events.column(col::TS)?;
    let ts = ts.as_any().downcast_ref::<Int64Array>().ok_or_else(|| {
        ArrowError::InvalidArgumentError(format!(
            "column '{}' must be Int64, found {:?}",
            col::TS,
            ts.data_type()
        ))
    })?;

    let parts: Vec<Option<TimeParts>> = ts
        .iter()
        .map(|v| v.and_then(TimeParts::from_millis))
        .collect();

    let start_time: TimestampMillisecondArray = parts
        .iter()
        .map(|p| p.as_ref().map(TimeParts::start_time_millis))
        .collect();
    let start_time = start_time.with_timezone(START_TIME_ZONE);

    events
        .with_column(col::START_TIME, Arc::new(start_time))?
        .with_column(col::HOUR, int_column(&parts, |p| p.hour))?
        .with_column(col::DAY, int_column(&parts, |p| p.day))?
        .with_column(col::WEEK, int_column(&parts, |p| p.week))?
        .with_column(col::MONTH, int_column(&parts, |p| p.month))?
        .with_column(col::YEAR, int_column(&parts, |p| p.year))?
        .with_column(col::WEEKDAY, int_column(&parts, |p| p.weekday))
}

/// Project the time table from timestamp-enriched events.
///
/// Plays sharing the exact same millisecond produce identical rows; those
/// are only collapsed when `dedup` is set.
pub async fn time_table(timed_events: &Dataset, dedup: bool) -> Result<Dataset> {
    let time = timed_events.project(&TIME_COLUMNS).await?;
    if dedup {
        time.dedup_by(&[col::START_TIME]).await
    } else {
        Ok(time)
    }
}

fn int_column(parts: &[Option<TimeParts>], field: impl Fn(&TimeParts) -> i32) -> ArrayRef {
    let array: Int32Array = parts.iter().map(|p| p.as_ref().map(&field)).collect();
    Arc::new(array)
}
