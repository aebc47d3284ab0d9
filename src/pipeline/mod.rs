//! Pipeline module
//!
//! Orchestrates load, transform and write for the two halves of the job.
//!
//! # Overview
//!
//! - `SongPipeline` - song metadata to the songs and artists tables
//! - `LogPipeline` - event logs (plus song metadata) to users, time and
//!   songplays
//! - [`run_all`] - opens both locations and runs the selected pipelines
//!
//! The derivation steps are exposed separately from the I/O so they can be
//! exercised against fixtures without any storage.

mod types;

pub use types::{LogTables, PipelineReport, RunSummary, SongTables};

use crate::config::EtlConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::input::{load_log_data, load_song_data};
use crate::output::{ParquetWriterConfig, TableWriter};
use crate::storage::Lake;
use crate::transform::{
    artists_table, catalog, next_song_events, resolve_plays, songplays_table, songs_table,
    time_table, users_table, with_time_columns, MonotonicIds, SequenceGenerator,
};
use crate::types::Table;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One independently runnable part of the job
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Load, transform and write every table this pipeline owns
    async fn run(&self) -> Result<PipelineReport>;
}

// ============================================================================
// Song Pipeline
// ============================================================================

/// Builds the songs and artists dimensions
pub struct SongPipeline {
    input: Lake,
    writer: TableWriter,
    song_prefix: String,
}

impl SongPipeline {
    /// Create a song pipeline reading below `config.song_prefix`
    pub fn new(input: Lake, writer: TableWriter, config: &EtlConfig) -> Self {
        Self {
            input,
            writer,
            song_prefix: config.song_prefix.clone(),
        }
    }

    /// Derive both dimensions from raw song metadata
    pub async fn derive(song_data: &Dataset) -> Result<SongTables> {
        Ok(SongTables {
            songs: songs_table(song_data).await?,
            artists: artists_table(song_data).await?,
        })
    }
}

#[async_trait]
impl Pipeline for SongPipeline {
    fn name(&self) -> &'static str {
        "songs"
    }

    async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        info!("Starting {} pipeline", self.name());

        let song_data = load_song_data(&self.input, &self.song_prefix).await?;
        let tables = Self::derive(&song_data).await?;

        let mut report = PipelineReport::new(self.name());
        report.add_table(self.writer.write_table(Table::Songs, &tables.songs).await?);
        report.add_table(
            self.writer
                .write_table(Table::Artists, &tables.artists)
                .await?,
        );

        report.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Finished {} pipeline in {}ms",
            self.name(),
            report.duration_ms
        );
        Ok(report)
    }
}

// ============================================================================
// Log Pipeline
// ============================================================================

/// Builds the users and time dimensions and the songplays fact table
pub struct LogPipeline {
    input: Lake,
    writer: TableWriter,
    song_prefix: String,
    log_prefix: String,
    dedup_time_rows: bool,
    ids: Arc<dyn SequenceGenerator>,
}

impl LogPipeline {
    /// Create a log pipeline with a fresh id generator
    pub fn new(input: Lake, writer: TableWriter, config: &EtlConfig) -> Self {
        Self {
            input,
            writer,
            song_prefix: config.song_prefix.clone(),
            log_prefix: config.log_prefix.clone(),
            dedup_time_rows: config.dedup_time_rows,
            ids: Arc::new(MonotonicIds::new()),
        }
    }

    /// Use a specific surrogate key generator
    #[must_use]
    pub fn with_sequence(mut self, ids: Arc<dyn SequenceGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Derive users, time and songplays from raw events and song metadata
    pub async fn derive(&self, log_data: &Dataset, song_data: &Dataset) -> Result<LogTables> {
        let plays = next_song_events(log_data).await?;
        debug!(
            "{} of {} events are plays",
            plays.num_rows(),
            log_data.num_rows()
        );

        let users = users_table(&plays).await?;
        let timed = with_time_columns(&plays)?;
        let time = time_table(&timed, self.dedup_time_rows).await?;

        let songs = songs_table(song_data).await?;
        let artists = artists_table(song_data).await?;
        let catalog = catalog(&songs, &artists).await?;
        let resolved = resolve_plays(&timed, &catalog).await?;
        debug!("Songplays join schema:\n{}", resolved.schema_tree());

        let songplays = songplays_table(&resolved, self.ids.as_ref()).await?;

        Ok(LogTables {
            users,
            time,
            songplays,
        })
    }
}

#[async_trait]
impl Pipeline for LogPipeline {
    fn name(&self) -> &'static str {
        "logs"
    }

    async fn run(&self) -> Result<PipelineReport> {
        let start = Instant::now();
        info!("Starting {} pipeline", self.name());

        let log_data = load_log_data(&self.input, &self.log_prefix).await?;
        let song_data = load_song_data(&self.input, &self.song_prefix).await?;
        let tables = self.derive(&log_data, &song_data).await?;

        let mut report = PipelineReport::new(self.name());
        report.add_table(self.writer.write_table(Table::Users, &tables.users).await?);
        report.add_table(self.writer.write_table(Table::Time, &tables.time).await?);
        report.add_table(
            self.writer
                .write_table(Table::Songplays, &tables.songplays)
                .await?,
        );

        report.set_duration(start.elapsed().as_millis() as u64);
        info!(
            "Finished {} pipeline in {}ms",
            self.name(),
            report.duration_ms
        );
        Ok(report)
    }
}

// ============================================================================
// Job
// ============================================================================

/// Run the pipelines selected by `config`, songs first
pub async fn run_all(config: &EtlConfig) -> Result<RunSummary> {
    let options = config.storage_options();
    let input = Lake::open(&config.input_root, &options)?;
    let output = Lake::open_output(&config.output_root, &options)?;
    run_with(config, input, output).await
}

/// Run the selected pipelines against already opened locations
pub async fn run_with(config: &EtlConfig, input: Lake, output: Lake) -> Result<RunSummary> {
    let start = Instant::now();
    let writer =
        TableWriter::new(output).with_config(ParquetWriterConfig::from_codec(config.compression));

    let mut pipelines: Vec<Box<dyn Pipeline>> = Vec::new();
    if config.pipeline.includes_songs() {
        pipelines.push(Box::new(SongPipeline::new(
            input.clone(),
            writer.clone(),
            config,
        )));
    }
    if config.pipeline.includes_logs() {
        pipelines.push(Box::new(LogPipeline::new(input, writer, config)));
    }

    let mut summary = RunSummary::new();
    for pipeline in &pipelines {
        summary.add_pipeline(pipeline.run().await?);
    }

    summary.set_duration(start.elapsed().as_millis() as u64);
    Ok(summary)
}

#[cfg(test)]
mod tests;
