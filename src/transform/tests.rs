//! Tests for transform module

use super::*;
use crate::dataset::Dataset;
use crate::input::{log_schema, records_to_batch, song_schema};
use arrow::array::{Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashSet;
use test_case::test_case;

fn dataset(records: &[Value], schema: arrow::datatypes::SchemaRef) -> Dataset {
    Dataset::new(records_to_batch(records, &schema).unwrap())
}

fn song(song_id: &str, title: &str, artist_id: &str, artist_name: &str, year: i64) -> Value {
    json!({
        "num_songs": 1,
        "song_id": song_id,
        "title": title,
        "artist_id": artist_id,
        "artist_name": artist_name,
        "artist_location": "",
        "artist_latitude": null,
        "artist_longitude": null,
        "duration": 200.5,
        "year": year
    })
}

fn event(page: &str, user: &str, level: &str, artist: &str, song: &str, ts: i64) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": format!("First{user}"),
        "gender": "F",
        "itemInSession": 0,
        "lastName": format!("Last{user}"),
        "length": 200.5,
        "level": level,
        "location": "Nowhere, XX",
        "method": "PUT",
        "page": page,
        "registration": 1540835983796.0,
        "sessionId": 38,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0",
        "userId": user
    })
}

fn strings(ds: &Dataset, name: &str) -> Vec<Option<String>> {
    let array = ds.column(name).unwrap();
    let array = array.as_any().downcast_ref::<StringArray>().unwrap();
    array.iter().map(|v| v.map(str::to_string)).collect()
}

fn int32s(ds: &Dataset, name: &str) -> Vec<Option<i32>> {
    let array = ds.column(name).unwrap();
    let array = array.as_any().downcast_ref::<Int32Array>().unwrap();
    array.iter().collect()
}

fn song_data() -> Dataset {
    dataset(
        &[
            song("S1", "Hello", "A1", "Adele", 2015),
            song("S2", "Someone Like You", "A1", "Adele", 2011),
            song("S1", "Hello", "A1", "Adele", 2015),
            song("S3", "Paranoid", "A2", "Black Sabbath", 1970),
            json!({"song_id": null, "title": "Ghost", "artist_id": "A3"}),
            json!({"song_id": "S4", "title": "Anonymous", "artist_id": null}),
        ],
        song_schema(),
    )
}

const TS_A: i64 = 1_542_069_417_796;
const TS_B: i64 = 1_541_903_636_796;

fn log_data() -> Dataset {
    dataset(
        &[
            event("NextSong", "10", "free", "Adele", "Hello", TS_A),
            event("Home", "99", "paid", "", "", TS_A),
            event("NextSong", "10", "paid", "Black Sabbath", "Paranoid", TS_B),
            event("NextSong", "26", "free", "Unknown Band", "Unknown Song", TS_B),
            event("Logout", "10", "paid", "", "", TS_B),
        ],
        log_schema(),
    )
}

// ============================================================================
// Time Derivation Tests
// ============================================================================

#[test]
fn test_time_parts_reference_timestamp() {
    let parts = TimeParts::from_millis(TS_A).unwrap();
    let expected = Utc
        .with_ymd_and_hms(2018, 11, 13, 0, 36, 57)
        .unwrap()
        .checked_add_signed(chrono::Duration::milliseconds(796))
        .unwrap();

    assert_eq!(parts.start_time, expected);
    assert_eq!(parts.start_time_millis(), TS_A);
    assert_eq!(parts.hour, 0);
    assert_eq!(parts.day, 13);
    assert_eq!(parts.week, 46);
    assert_eq!(parts.month, 11);
    assert_eq!(parts.year, 2018);
    // Tuesday
    assert_eq!(parts.weekday, 3);
}

#[test]
fn test_time_parts_one_am() {
    let parts = TimeParts::from_millis(1_542_074_217_796).unwrap();
    assert_eq!(parts.start_time.to_rfc3339(), "2018-11-13T01:56:57.796+00:00");
    assert_eq!((parts.hour, parts.day, parts.month, parts.year), (1, 13, 11, 2018));
}

#[test_case(1_541_289_600_000, 1, 44 ; "sunday 2018-11-04")]
#[test_case(1_541_376_000_000, 2, 45 ; "monday 2018-11-05")]
#[test_case(1_541_894_400_000, 1, 45 ; "sunday 2018-11-11")]
#[test_case(1_543_536_000_000, 6, 48 ; "friday 2018-11-30")]
#[test_case(1_546_214_400_000, 2, 1 ; "monday 2018-12-31 is iso week 1")]
fn test_weekday_and_week_convention(ts: i64, weekday: i32, week: i32) {
    let parts = TimeParts::from_millis(ts).unwrap();
    assert_eq!(parts.weekday, weekday);
    assert_eq!(parts.week, week);
}

#[test]
fn test_time_parts_is_pure() {
    assert_eq!(TimeParts::from_millis(TS_B), TimeParts::from_millis(TS_B));
}

#[test]
fn test_time_parts_out_of_range() {
    assert!(TimeParts::from_millis(i64::MAX).is_none());
}

async fn timed_plays() -> Dataset {
    with_time_columns(&next_song_events(&log_data()).await.unwrap()).unwrap()
}

async fn song_catalog(song_data: &Dataset) -> Dataset {
    let songs = songs_table(song_data).await.unwrap();
    let artists = artists_table(song_data).await.unwrap();
    catalog(&songs, &artists).await.unwrap()
}

#[tokio::test]
async fn test_with_time_columns() {
    let timed = timed_plays().await;

    let start = timed.column("start_time").unwrap();
    assert_eq!(
        start.data_type(),
        &DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
    );
    let start = start
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .unwrap();
    assert_eq!(start.value(0), TS_A);

    assert_eq!(int32s(&timed, "year"), vec![Some(2018); 3]);
    assert_eq!(int32s(&timed, "month"), vec![Some(11); 3]);
    assert_eq!(int32s(&timed, "day"), vec![Some(13), Some(11), Some(11)]);
}

#[test]
fn test_with_time_columns_null_ts() {
    let events = dataset(&[json!({"page": "NextSong"})], log_schema());
    let timed = with_time_columns(&events).unwrap();
    assert!(timed.column("start_time").unwrap().is_null(0));
    assert_eq!(int32s(&timed, "hour"), vec![None]);
}

// ============================================================================
// Song Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_songs_table_one_row_per_song_id() {
    let songs = songs_table(&song_data()).await.unwrap();
    assert_eq!(songs.column_names(), SONG_COLUMNS.to_vec());
    assert_eq!(
        strings(&songs, "song_id"),
        vec![
            Some("S1".to_string()),
            Some("S2".to_string()),
            Some("S3".to_string()),
            Some("S4".to_string())
        ]
    );
}

#[tokio::test]
async fn test_artists_table_one_row_per_artist_id() {
    let artists = artists_table(&song_data()).await.unwrap();
    assert_eq!(artists.column_names(), ARTIST_COLUMNS.to_vec());

    let ids = strings(&artists, "artist_id");
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(Option::is_some));
    let distinct: HashSet<_> = ids.into_iter().collect();
    assert_eq!(distinct.len(), 3);
}

// ============================================================================
// Log Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_next_song_filter() {
    let plays = next_song_events(&log_data()).await.unwrap();
    assert_eq!(plays.num_rows(), 3);
    assert!(strings(&plays, "page")
        .iter()
        .all(|p| p.as_deref() == Some("NextSong")));
}

#[tokio::test]
async fn test_users_only_from_next_song() {
    let plays = next_song_events(&log_data()).await.unwrap();
    let users = users_table(&plays).await.unwrap();
    assert_eq!(users.column_names(), USER_COLUMNS.to_vec());
    // user 99 only visited Home
    assert_eq!(
        strings(&users, "userId"),
        vec![Some("10".to_string()), Some("26".to_string())]
    );
    // dedup keeps the earliest row in input order, and user 10 played first as free
    assert_eq!(strings(&users, "level")[0], Some("free".to_string()));
}

#[tokio::test]
async fn test_time_table_keeps_duplicate_timestamps() {
    let timed = timed_plays().await;

    let time = time_table(&timed, false).await.unwrap();
    assert_eq!(time.column_names(), TIME_COLUMNS.to_vec());
    assert_eq!(time.num_rows(), 3);

    let deduped = time_table(&timed, true).await.unwrap();
    assert_eq!(deduped.num_rows(), 2);
}

// ============================================================================
// Songplays Tests
// ============================================================================

#[tokio::test]
async fn test_catalog_is_driven_by_songs() {
    let songs = songs_table(&song_data()).await.unwrap();
    let catalog = song_catalog(&song_data()).await;

    assert_eq!(catalog.num_rows(), songs.num_rows());
    assert!(catalog.index_of("song_release_year").is_ok());
    assert!(catalog.index_of("year").is_err());

    // S4 has no artist_id, so no artist_name either
    let titles = strings(&catalog, "title");
    let names = strings(&catalog, "artist_name");
    let anonymous = titles
        .iter()
        .position(|t| t.as_deref() == Some("Anonymous"))
        .unwrap();
    assert_eq!(names[anonymous], None);
}

#[tokio::test]
async fn test_songplays_keep_every_play() {
    let catalog = song_catalog(&song_data()).await;
    let resolved = resolve_plays(&timed_plays().await, &catalog).await.unwrap();
    let ids = MonotonicIds::new();
    let plays = songplays_table(&resolved, &ids).await.unwrap();

    assert_eq!(plays.column_names(), SONGPLAY_COLUMNS.to_vec());
    assert_eq!(plays.num_rows(), 3);
    assert_eq!(
        strings(&plays, "song_id"),
        vec![Some("S1".to_string()), Some("S3".to_string()), None]
    );
    assert_eq!(
        strings(&plays, "artist_id"),
        vec![Some("A1".to_string()), Some("A2".to_string()), None]
    );
    assert_eq!(
        strings(&plays, "location"),
        vec![Some("Nowhere, XX".to_string()); 3]
    );
    assert_eq!(int32s(&plays, "year"), vec![Some(2018); 3]);

    let ids = plays.column("songplay_id").unwrap();
    let ids = ids.as_any().downcast_ref::<Int64Array>().unwrap();
    let distinct: HashSet<i64> = ids.iter().flatten().collect();
    assert_eq!(distinct.len(), 3);
}

#[tokio::test]
async fn test_songplays_match_needs_artist_and_title() {
    let catalog = song_catalog(&song_data()).await;

    // right title, wrong artist
    let events = dataset(
        &[event("NextSong", "7", "free", "Black Sabbath", "Hello", TS_A)],
        log_schema(),
    );
    let timed = with_time_columns(&events).unwrap();
    let resolved = resolve_plays(&timed, &catalog).await.unwrap();
    let plays = songplays_table(&resolved, &MonotonicIds::new())
        .await
        .unwrap();
    assert_eq!(strings(&plays, "song_id"), vec![None]);
}

#[tokio::test]
async fn test_songplays_one_row_per_event_when_titles_repeat() {
    // the same artist and title released under two song ids
    let song_data = dataset(
        &[
            song("S1", "Hello", "A1", "Adele", 2015),
            song("S9", "Hello", "A1", "Adele", 2016),
        ],
        song_schema(),
    );
    let catalog = song_catalog(&song_data).await;
    assert_eq!(catalog.num_rows(), 2);

    let events = dataset(
        &[event("NextSong", "10", "free", "Adele", "Hello", TS_A)],
        log_schema(),
    );
    let plays = next_song_events(&events).await.unwrap();
    let timed = with_time_columns(&plays).unwrap();
    let resolved = resolve_plays(&timed, &catalog).await.unwrap();
    let songplays = songplays_table(&resolved, &MonotonicIds::new())
        .await
        .unwrap();

    assert_eq!(songplays.num_rows(), plays.num_rows());
    assert_eq!(strings(&songplays, "song_id"), vec![Some("S1".to_string())]);
}

// ============================================================================
// Sequence Tests
// ============================================================================

#[test]
fn test_monotonic_ids_unique() {
    let ids = MonotonicIds::new();
    let values: Vec<i64> = (0..100).map(|_| ids.next_id()).collect();
    let distinct: HashSet<i64> = values.iter().copied().collect();
    assert_eq!(distinct.len(), 100);
}

#[test]
fn test_monotonic_ids_partitions_do_not_collide() {
    let first = MonotonicIds::for_partition(0);
    let second = MonotonicIds::for_partition(1);
    assert_eq!(first.next_id(), 0);
    assert_eq!(second.next_id(), 1_i64 << 33);
    assert_eq!(second.next_id(), (1_i64 << 33) + 1);
}

#[tokio::test]
async fn test_sequence_generator_is_injectable() {
    struct Fixed(std::sync::atomic::AtomicI64);
    impl SequenceGenerator for Fixed {
        fn next_id(&self) -> i64 {
            self.0.fetch_add(10, std::sync::atomic::Ordering::Relaxed)
        }
    }

    let events = dataset(
        &[
            event("NextSong", "1", "free", "x", "y", TS_A),
            event("NextSong", "2", "free", "x", "y", TS_B),
        ],
        log_schema(),
    );
    let timed = with_time_columns(&events).unwrap();
    let catalog = song_catalog(&song_data()).await;
    let resolved = resolve_plays(&timed, &catalog).await.unwrap();
    let plays = songplays_table(&resolved, &Fixed(std::sync::atomic::AtomicI64::new(100)))
        .await
        .unwrap();

    let ids = plays.column("songplay_id").unwrap();
    let ids = ids.as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.values().to_vec(), vec![100, 110]);
}
