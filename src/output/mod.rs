//! Output module
//!
//! Persists derived tables as Hive-partitioned Parquet.
//!
//! # Overview
//!
//! - `writer` - Parquet encoding with a configurable codec
//! - `partition` - splitting a table by its partition columns
//!
//! Each table fully replaces its previous output: the table prefix is
//! cleared, one `part-00000` file is written per partition, and a `_SUCCESS`
//! marker is written last.

mod partition;
mod writer;

pub use partition::{split_partitions, PartitionSlice, NULL_PARTITION};
pub use writer::ParquetWriterConfig;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::storage::Lake;
use crate::types::Table;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use serde::Serialize;
use tracing::{debug, info};

/// Name of the completion marker written after all data files
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Outcome of writing one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    /// Table name
    pub table: String,
    /// Rows written
    pub rows: usize,
    /// Partition directories written (0 for an unpartitioned table)
    pub partitions: usize,
    /// Parquet files written
    pub files: usize,
    /// Destination of the table
    pub location: String,
}

/// Writes tables below an output lake
#[derive(Debug, Clone)]
pub struct TableWriter {
    lake: Lake,
    config: ParquetWriterConfig,
}

impl TableWriter {
    /// Create a writer with the default Parquet settings
    pub fn new(lake: Lake) -> Self {
        Self {
            lake,
            config: ParquetWriterConfig::default(),
        }
    }

    /// Use the given Parquet settings
    #[must_use]
    pub fn with_config(mut self, config: ParquetWriterConfig) -> Self {
        self.config = config;
        self
    }

    /// The lake being written to
    pub fn lake(&self) -> &Lake {
        &self.lake
    }

    /// Write one of the star-schema tables with its partition policy
    pub async fn write_table(&self, table: Table, dataset: &Dataset) -> Result<TableReport> {
        self.write_dataset(table.name(), dataset, table.partition_columns())
            .await
    }

    /// Overwrite `<root>/<name>/` with `dataset`, partitioned by `partition_by`
    pub async fn write_dataset(
        &self,
        name: &str,
        dataset: &Dataset,
        partition_by: &[&str],
    ) -> Result<TableReport> {
        let table_path = self.lake.path(name);
        let location = self.lake.display(&table_path);

        let removed = self.lake.delete_prefix(name).await?;
        if removed > 0 {
            debug!("Removed {} existing objects under {}", removed, location);
        }

        let file_name = format!("part-00000.{}.parquet", self.config.extension());
        let mut files = 0;
        let mut partitions = 0;

        if partition_by.is_empty() {
            let data = self.config.encode(dataset.batch())?;
            self.lake.put(&table_path.child(file_name.as_str()), data).await?;
            files += 1;
        } else {
            for slice in split_partitions(dataset.batch(), partition_by)? {
                let dir = slice
                    .segments
                    .iter()
                    .fold(table_path.clone(), |path, segment| path.child(segment.as_str()));
                let data = self.config.encode(&slice.batch)?;
                self.lake.put(&dir.child(file_name.as_str()), data).await?;
                partitions += 1;
                files += 1;
            }
        }

        self.write_marker(&table_path).await?;

        let report = TableReport {
            table: name.to_string(),
            rows: dataset.num_rows(),
            partitions,
            files,
            location,
        };
        info!(
            "Wrote {}: {} rows, {} partitions, {} files to {}",
            report.table, report.rows, report.partitions, report.files, report.location
        );
        Ok(report)
    }

    async fn write_marker(&self, table_path: &ObjectPath) -> Result<()> {
        self.lake
            .put(&table_path.child(SUCCESS_MARKER), Bytes::new())
            .await
    }
}
