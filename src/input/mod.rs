//! Input module
//!
//! Loads the two raw JSON sources into [`Dataset`]s.
//!
//! # Overview
//!
//! - Song metadata lives under a deeply nested directory tree; every file
//!   below the prefix is read, however deep.
//! - Event logs live under a single year/month prefix.
//! - Each file holds one JSON object per line and is converted against a
//!   declared Arrow schema.

mod decode;
mod schema;

pub use decode::decode_json_lines;
pub use schema::{log_schema, records_to_batch, song_schema};

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::storage::Lake;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tracing::{debug, info};

/// Load every JSON file below `prefix` into one dataset with `schema`
pub async fn load_json(lake: &Lake, prefix: &str, schema: SchemaRef) -> Result<Dataset> {
    let files = lake.list_json(prefix).await?;
    if files.is_empty() {
        return Err(Error::EmptyInput {
            path: lake.display(&lake.path(prefix)),
        });
    }
    debug!("Reading {} JSON files under {}", files.len(), prefix);

    let bodies = lake.read_all(files).await?;

    let mut batches: Vec<RecordBatch> = Vec::with_capacity(bodies.len());
    for (path, data) in &bodies {
        let source = lake.display(path);
        let body = std::str::from_utf8(data)
            .map_err(|e| Error::decode(format!("{source}: not valid UTF-8: {e}")))?;
        let records = decode_json_lines(body, &source)?;
        let batch = records_to_batch(&records, &schema).map_err(|e| match e {
            Error::Decode { message } => Error::decode(format!("{source}: {message}")),
            other => other,
        })?;
        batches.push(batch);
    }

    let dataset = Dataset::from_batches(schema, &batches)?;
    info!(
        "Loaded {} records from {} files under {}",
        dataset.num_rows(),
        bodies.len(),
        prefix
    );
    Ok(dataset)
}

/// Load all song metadata records
pub async fn load_song_data(lake: &Lake, prefix: &str) -> Result<Dataset> {
    load_json(lake, prefix, song_schema()).await
}

/// Load all event log records
pub async fn load_log_data(lake: &Lake, prefix: &str) -> Result<Dataset> {
    load_json(lake, prefix, log_schema()).await
}
