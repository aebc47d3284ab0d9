//! Tests for pipeline module

use super::*;
use crate::config::PipelineSelection;
use crate::input::{log_schema, records_to_batch, song_schema};
use arrow::array::{Array, Int64Array};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};

fn song_line(song_id: &str, title: &str, artist_id: &str, artist_name: &str) -> String {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": null,
        "artist_longitude": null,
        "artist_location": "",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": 218.93179,
        "year": 2004
    })
    .to_string()
}

fn event_line(page: &str, user: &str, artist: &str, song: &str, ts: i64) -> String {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": "Kaylee",
        "gender": "F",
        "itemInSession": 0,
        "lastName": "Summers",
        "length": 218.93179,
        "level": "free",
        "location": "Phoenix-Mesa-Scottsdale, AZ",
        "method": "PUT",
        "page": page,
        "registration": 1540344794796.0,
        "sessionId": 139,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0",
        "userId": user
    })
    .to_string()
}

async fn seeded_input() -> Lake {
    let lake = Lake::in_memory();
    let files = [
        (
            "song_data/A/A/A/TRAAAAW128F429D538.json",
            song_line("SOAAA", "Intro", "AR1", "Casual"),
        ),
        (
            "song_data/A/B/C/TRABCEI128F424C983.json",
            song_line("SOABC", "Outro", "AR2", "The Band"),
        ),
        (
            "log_data/2018/11/2018-11-12-events.json",
            [
                event_line("NextSong", "8", "Casual", "Intro", 1_542_069_417_796),
                event_line("Home", "8", "", "", 1_542_069_418_000),
                event_line("NextSong", "26", "Nobody", "Nothing", 1_542_074_217_796),
            ]
            .join("\n"),
        ),
    ];
    for (path, body) in files {
        lake.put(&lake.path(path), Bytes::from(body)).await.unwrap();
    }
    lake
}

fn dataset(records: &[Value], schema: arrow::datatypes::SchemaRef) -> Dataset {
    Dataset::new(records_to_batch(records, &schema).unwrap())
}

struct Counter(AtomicI64);

impl SequenceGenerator for Counter {
    fn next_id(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

// ============================================================================
// Derivation Tests
// ============================================================================

#[tokio::test]
async fn test_song_derive() {
    let song_data = dataset(
        &[
            json!({"song_id": "S1", "artist_id": "A1", "title": "One"}),
            json!({"song_id": "S1", "artist_id": "A1", "title": "One"}),
            json!({"song_id": "S2", "artist_id": "A1", "title": "Two"}),
        ],
        song_schema(),
    );
    let tables = SongPipeline::derive(&song_data).await.unwrap();
    assert_eq!(tables.songs.num_rows(), 2);
    assert_eq!(tables.artists.num_rows(), 1);
}

#[tokio::test]
async fn test_log_derive_uses_injected_sequence() {
    let song_data = dataset(
        &[json!({"song_id": "S1", "artist_id": "A1", "artist_name": "Band", "title": "One"})],
        song_schema(),
    );
    let log_data = dataset(
        &[
            json!({
                "page": "NextSong", "userId": "1", "artist": "Band", "song": "One",
                "ts": 1_542_069_417_796_i64
            }),
            json!({
                "page": "NextSong", "userId": "1", "artist": "Band", "song": "Two",
                "ts": 1_542_069_417_796_i64
            }),
            json!({"page": "Home", "userId": "2", "ts": 1_542_069_417_900_i64}),
        ],
        log_schema(),
    );

    let lake = Lake::in_memory();
    let pipeline = LogPipeline::new(
        lake.clone(),
        TableWriter::new(lake),
        &EtlConfig::with_roots("memory://", "memory://"),
    )
    .with_sequence(Arc::new(Counter(AtomicI64::new(500))));

    let tables = pipeline.derive(&log_data, &song_data).await.unwrap();
    assert_eq!(tables.users.num_rows(), 1);
    // identical timestamps are kept unless time dedup is enabled
    assert_eq!(tables.time.num_rows(), 2);
    assert_eq!(tables.songplays.num_rows(), 2);

    let ids = tables.songplays.column("songplay_id").unwrap();
    let ids = ids.as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.values().to_vec(), vec![500, 501]);

    let song_ids = tables.songplays.column("song_id").unwrap();
    assert!(!song_ids.is_null(0));
    assert!(song_ids.is_null(1));
}

#[tokio::test]
async fn test_log_derive_time_dedup() {
    let song_data = dataset(&[json!({"song_id": "S1", "artist_id": "A1"})], song_schema());
    let log_data = dataset(
        &[
            json!({"page": "NextSong", "userId": "1", "ts": 1_542_069_417_796_i64}),
            json!({"page": "NextSong", "userId": "2", "ts": 1_542_069_417_796_i64}),
        ],
        log_schema(),
    );

    let lake = Lake::in_memory();
    let config = EtlConfig::with_roots("memory://", "memory://").with_time_dedup(true);
    let pipeline = LogPipeline::new(lake.clone(), TableWriter::new(lake), &config);

    let tables = pipeline.derive(&log_data, &song_data).await.unwrap();
    assert_eq!(tables.time.num_rows(), 1);
    assert_eq!(tables.songplays.num_rows(), 2);
}

// ============================================================================
// Run Tests
// ============================================================================

#[tokio::test]
async fn test_run_with_writes_all_tables() {
    let input = seeded_input().await;
    let output = Lake::in_memory();
    let config = EtlConfig::with_roots("memory://", "memory://");

    let summary = run_with(&config, input, output.clone()).await.unwrap();

    let names: Vec<&str> = summary.tables().map(|t| t.table.as_str()).collect();
    assert_eq!(names, vec!["songs", "artists", "users", "time", "songplays"]);
    assert_eq!(summary.pipelines.len(), 2);

    let rows = |name: &str| summary.table(name).map(|t| t.rows);
    assert_eq!(rows("songs"), Some(2));
    assert_eq!(rows("artists"), Some(2));
    assert_eq!(rows("users"), Some(2));
    assert_eq!(rows("time"), Some(2));
    assert_eq!(rows("songplays"), Some(2));
    assert_eq!(summary.total_rows(), 10);

    let songs = output.list("songs").await.unwrap();
    let songs: Vec<String> = songs.iter().map(|m| m.location.to_string()).collect();
    assert_eq!(
        songs,
        vec![
            "songs/_SUCCESS",
            "songs/year=2004/artist_id=AR1/part-00000.snappy.parquet",
            "songs/year=2004/artist_id=AR2/part-00000.snappy.parquet",
        ]
    );

    let plays = output.list("songplays").await.unwrap();
    assert!(plays
        .iter()
        .any(|m| m.location.as_ref() == "songplays/year=2018/month=11/part-00000.snappy.parquet"));
}

#[tokio::test]
async fn test_run_with_song_pipeline_only() {
    let input = seeded_input().await;
    let output = Lake::in_memory();
    let config =
        EtlConfig::with_roots("memory://", "memory://").with_pipeline(PipelineSelection::Songs);

    let summary = run_with(&config, input, output.clone()).await.unwrap();
    assert_eq!(summary.pipelines.len(), 1);
    assert_eq!(summary.pipelines[0].pipeline, "songs");
    assert!(output.list("users").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_run_with_missing_logs_fails() {
    let input = seeded_input().await;
    let config =
        EtlConfig::with_roots("memory://", "memory://").with_log_prefix("log_data/2019/01");

    let err = run_with(&config, input, Lake::in_memory())
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::EmptyInput { .. }));
}

#[test]
fn test_report_accessors() {
    let mut report = PipelineReport::new("logs");
    report.add_table(crate::output::TableReport {
        table: "users".to_string(),
        rows: 3,
        partitions: 0,
        files: 1,
        location: "memory://users".to_string(),
    });
    assert_eq!(report.rows(), 3);
    assert!(report.table("users").is_some());
    assert!(report.table("time").is_none());

    let mut summary = RunSummary::new();
    summary.add_pipeline(report);
    summary.set_duration(12);
    let json: Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
    assert_eq!(json["duration_ms"], 12);
    assert_eq!(json["pipelines"][0]["pipeline"], "logs");
    assert_eq!(json["pipelines"][0]["tables"][0]["table"], "users");
    assert_eq!(json["pipelines"][0]["tables"][0]["rows"], 3);
}
