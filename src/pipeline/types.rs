//! Pipeline types
//!
//! Derived table sets and run reports.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::output::TableReport;
use serde::Serialize;

/// Dimensions derived from song metadata
#[derive(Debug, Clone)]
pub struct SongTables {
    /// One row per song
    pub songs: Dataset,
    /// One row per artist
    pub artists: Dataset,
}

/// Tables derived from the event logs
#[derive(Debug, Clone)]
pub struct LogTables {
    /// One row per user
    pub users: Dataset,
    /// One row per play timestamp
    pub time: Dataset,
    /// One row per play
    pub songplays: Dataset,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Pipeline name
    pub pipeline: String,
    /// Tables written, in write order
    pub tables: Vec<TableReport>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Create an empty report
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            ..Self::default()
        }
    }

    /// Record a written table
    pub fn add_table(&mut self, report: TableReport) {
        self.tables.push(report);
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }

    /// Report for the named table, if it was written
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Rows written across all tables
    pub fn rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Outcome of a whole job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Pipelines run, in order
    pub pipelines: Vec<PipelineReport>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished pipeline
    pub fn add_pipeline(&mut self, report: PipelineReport) {
        self.pipelines.push(report);
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }

    /// Every table written, in write order
    pub fn tables(&self) -> impl Iterator<Item = &TableReport> {
        self.pipelines.iter().flat_map(|p| p.tables.iter())
    }

    /// Report for the named table, if it was written
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables().find(|t| t.table == name)
    }

    /// Rows written across all pipelines
    pub fn total_rows(&self) -> usize {
        self.pipelines.iter().map(PipelineReport::rows).sum()
    }

    /// Render the summary as a single JSON line
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
