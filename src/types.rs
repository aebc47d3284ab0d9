//! Common types used throughout the ETL job
//!
//! Table identities, their output partitioning, and the column names the
//! transformations project.

use std::fmt;

// ============================================================================
// Output Tables
// ============================================================================

/// One of the five tables of the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Song dimension
    Songs,
    /// Artist dimension
    Artists,
    /// User dimension
    Users,
    /// Time dimension
    Time,
    /// Songplay fact table
    Songplays,
}

impl Table {
    /// All tables in the order the job writes them
    pub const ALL: [Table; 5] = [
        Table::Songs,
        Table::Artists,
        Table::Users,
        Table::Time,
        Table::Songplays,
    ];

    /// Directory name of the table under the output root
    pub fn name(self) -> &'static str {
        match self {
            Table::Songs => "songs",
            Table::Artists => "artists",
            Table::Users => "users",
            Table::Time => "time",
            Table::Songplays => "songplays",
        }
    }

    /// Columns the table is partitioned by, outermost first
    pub fn partition_columns(self) -> &'static [&'static str] {
        match self {
            Table::Songs => &[col::YEAR, col::ARTIST_ID],
            Table::Time | Table::Songplays => &[col::YEAR, col::MONTH],
            Table::Artists | Table::Users => &[],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Page value of log events that represent an actual play
pub const NEXT_SONG_PAGE: &str = "NextSong";

// ============================================================================
// Column Names
// ============================================================================

/// Column names shared by inputs and outputs
pub mod col {
    // song metadata
    pub const SONG_ID: &str = "song_id";
    pub const TITLE: &str = "title";
    pub const ARTIST_ID: &str = "artist_id";
    pub const YEAR: &str = "year";
    pub const DURATION: &str = "duration";
    pub const NUM_SONGS: &str = "num_songs";
    pub const ARTIST_NAME: &str = "artist_name";
    pub const ARTIST_LOCATION: &str = "artist_location";
    pub const ARTIST_LATITUDE: &str = "artist_latitude";
    pub const ARTIST_LONGITUDE: &str = "artist_longitude";
    /// Songs-side release year once joined into the catalog
    pub const SONG_RELEASE_YEAR: &str = "song_release_year";

    // log events
    pub const ARTIST: &str = "artist";
    pub const AUTH: &str = "auth";
    pub const FIRST_NAME: &str = "firstName";
    pub const GENDER: &str = "gender";
    pub const ITEM_IN_SESSION: &str = "itemInSession";
    pub const LAST_NAME: &str = "lastName";
    pub const LENGTH: &str = "length";
    pub const LEVEL: &str = "level";
    pub const LOCATION: &str = "location";
    pub const METHOD: &str = "method";
    pub const PAGE: &str = "page";
    pub const REGISTRATION: &str = "registration";
    pub const SESSION_ID: &str = "sessionId";
    pub const SONG: &str = "song";
    pub const STATUS: &str = "status";
    pub const TS: &str = "ts";
    pub const USER_AGENT: &str = "userAgent";
    pub const USER_ID: &str = "userId";

    // derived
    pub const START_TIME: &str = "start_time";
    pub const HOUR: &str = "hour";
    pub const DAY: &str = "day";
    pub const WEEK: &str = "week";
    pub const MONTH: &str = "month";
    pub const WEEKDAY: &str = "weekday";
    pub const SONGPLAY_ID: &str = "songplay_id";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_policy() {
        assert_eq!(Table::Songs.partition_columns(), &["year", "artist_id"]);
        assert_eq!(Table::Time.partition_columns(), &["year", "month"]);
        assert_eq!(Table::Songplays.partition_columns(), &["year", "month"]);
        assert!(Table::Artists.partition_columns().is_empty());
        assert!(Table::Users.partition_columns().is_empty());
    }

    #[test]
    fn test_table_names() {
        let names: Vec<&str> = Table::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["songs", "artists", "users", "time", "songplays"]);
        assert_eq!(Table::Songplays.to_string(), "songplays");
    }
}
