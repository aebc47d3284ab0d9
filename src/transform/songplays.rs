//! Songplay fact table: the catalog join and surrogate keys

use super::sequence::SequenceGenerator;
use crate::dataset::{Dataset, JoinKind, JoinOn};
use crate::error::Result;
use crate::types::col;
use arrow::array::Int64Array;
use std::sync::Arc;

/// Columns of the songplays table
pub const SONGPLAY_COLUMNS: [&str; 11] = [
    col::SONGPLAY_ID,
    col::START_TIME,
    col::USER_ID,
    col::LEVEL,
    col::SONG_ID,
    col::ARTIST_ID,
    col::SESSION_ID,
    col::LOCATION,
    col::USER_AGENT,
    col::YEAR,
    col::MONTH,
];

/// Songs with their artist attached.
///
/// Songs drive the result: a song whose artist is missing keeps null artist
/// fields, and an artist without songs is dropped. The songs-side `year` is
/// renamed to `song_release_year` so it cannot clash with the event year.
pub async fn catalog(songs: &Dataset, artists: &Dataset) -> Result<Dataset> {
    let songs = songs.rename(col::YEAR, col::SONG_RELEASE_YEAR)?;
    artists
        .join(&songs, &JoinOn::using(&[col::ARTIST_ID]), JoinKind::Right)
        .await
}

/// Attach catalog entries to timestamp-enriched play events.
///
/// Matches on artist name and song title. Every event is kept exactly once;
/// events that resolve to nothing carry null catalog columns. When several
/// catalog songs share an artist name and title, the first one in catalog
/// order is the match.
pub async fn resolve_plays(timed_events: &Dataset, catalog: &Dataset) -> Result<Dataset> {
    let catalog = catalog.dedup_by(&[col::ARTIST_NAME, col::TITLE]).await?;
    timed_events
        .join(
            &catalog,
            &JoinOn::columns(&[(col::ARTIST, col::ARTIST_NAME), (col::SONG, col::TITLE)]),
            JoinKind::Left,
        )
        .await
}

/// Project the fact columns and stamp each row with a fresh `songplay_id`
pub async fn songplays_table(resolved: &Dataset, ids: &dyn SequenceGenerator) -> Result<Dataset> {
    let plays = resolved.project(&SONGPLAY_COLUMNS[1..]).await?;
    let songplay_ids: Int64Array = (0..plays.num_rows()).map(|_| ids.next_id()).collect();
    plays
        .with_column(col::SONGPLAY_ID, Arc::new(songplay_ids))?
        .project(&SONGPLAY_COLUMNS)
        .await
}
