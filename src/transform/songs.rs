//! Song and artist dimensions

use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::col;

/// Columns of the songs table
pub const SONG_COLUMNS: [&str; 5] = [
    col::SONG_ID,
    col::TITLE,
    col::ARTIST_ID,
    col::YEAR,
    col::DURATION,
];

/// Columns of the artists table
pub const ARTIST_COLUMNS: [&str; 5] = [
    col::ARTIST_ID,
    col::ARTIST_NAME,
    col::ARTIST_LOCATION,
    col::ARTIST_LATITUDE,
    col::ARTIST_LONGITUDE,
];

/// One row per distinct, non-null `song_id`
pub async fn songs_table(song_data: &Dataset) -> Result<Dataset> {
    song_data
        .project(&SONG_COLUMNS)
        .await?
        .drop_nulls(&[col::SONG_ID])
        .await?
        .dedup_by(&[col::SONG_ID])
        .await
}

/// One row per distinct, non-null `artist_id`
pub async fn artists_table(song_data: &Dataset) -> Result<Dataset> {
    song_data
        .project(&ARTIST_COLUMNS)
        .await?
        .drop_nulls(&[col::ARTIST_ID])
        .await?
        .dedup_by(&[col::ARTIST_ID])
        .await
}
