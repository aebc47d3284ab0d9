//! CLI arguments and parsing

use crate::config::{Codec, PipelineSelection};
use clap::Parser;
use std::path::PathBuf;

/// Reshape song metadata and listening logs into a partitioned Parquet star schema
#[derive(Parser, Debug)]
#[command(name = "songplay-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input location (local path or s3://, s3a://, r2://, gs://, az:// URL)
    #[arg(short, long, env = "ETL_INPUT_ROOT")]
    pub input: Option<String>,

    /// Output location (local path or s3://, s3a://, r2://, gs://, az:// URL)
    #[arg(short, long, env = "ETL_OUTPUT_ROOT")]
    pub output: Option<String>,

    /// Job file (YAML)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Credential file holding AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY
    #[arg(long, env = "ETL_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Bucket region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Event log prefix under the input location
    #[arg(long, env = "ETL_LOG_PREFIX")]
    pub log_prefix: Option<String>,

    /// Song metadata prefix under the input location
    #[arg(long, env = "ETL_SONG_PREFIX")]
    pub song_prefix: Option<String>,

    /// Parquet compression codec
    #[arg(long)]
    pub compression: Option<Codec>,

    /// Collapse time rows that share the same start_time
    #[arg(long)]
    pub dedup_time_rows: bool,

    /// Pipelines to run
    #[arg(short, long)]
    pub pipeline: Option<PipelineSelection>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
