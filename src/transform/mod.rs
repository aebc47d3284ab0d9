//! Transformation module
//!
//! The data-shaping core of the job. Every function here is a pure
//! derivation from one or more [`Dataset`](crate::dataset::Dataset)s to a
//! new one; nothing reads or writes storage.
//!
//! # Overview
//!
//! - `songs` - songs and artists dimensions from song metadata
//! - `events` - NextSong filter, time columns, users and time dimensions
//! - `songplays` - the catalog join and the fact table
//! - `time` - epoch-millisecond to calendar-field derivation (UTC)
//! - `sequence` - injectable surrogate key generator

mod events;
mod sequence;
mod songplays;
mod songs;
mod time;

pub use events::{
    next_song_events, time_table, users_table, with_time_columns, TIME_COLUMNS, USER_COLUMNS,
};
pub use sequence::{MonotonicIds, SequenceGenerator};
pub use songplays::{catalog, resolve_plays, songplays_table, SONGPLAY_COLUMNS};
pub use songs::{artists_table, songs_table, ARTIST_COLUMNS, SONG_COLUMNS};
pub use time::{TimeParts, START_TIME_ZONE};

#[cfg(test)]
mod tests;
