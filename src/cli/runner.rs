//! CLI runner - resolves configuration and runs the job

use crate::cli::commands::Cli;
use crate::config::{EtlConfig, JobFile};
use crate::error::Result;
use crate::pipeline::{run_all, RunSummary};
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Resolve the run configuration and execute the selected pipelines
    pub async fn run(&self) -> Result<RunSummary> {
        let config = self.config()?;
        info!(
            "Running {:?} pipelines from {} to {}",
            config.pipeline, config.input_root, config.output_root
        );
        debug!("Resolved config: {:?}", config);

        let summary = run_all(&config).await?;
        for table in summary.tables() {
            info!(
                "{}: {} rows in {} files at {}",
                table.table, table.rows, table.files, table.location
            );
        }
        info!(
            "Wrote {} rows to {} tables in {}ms",
            summary.total_rows(),
            summary.tables().count(),
            summary.duration_ms
        );
        debug!("Run summary: {}", summary.to_json()?);
        Ok(summary)
    }

    /// Resolve the configuration: defaults, then the job file, then flags and
    /// environment. Credentials are loaded last, before any storage is opened.
    pub fn config(&self) -> Result<EtlConfig> {
        let mut config = EtlConfig::new();
        let mut credentials_path = None;

        if let Some(path) = &self.cli.config {
            let job = JobFile::from_file(path)?;
            config = config.merge_job_file(&job);
            credentials_path = job.credentials;
        }

        let cli = &self.cli;
        if let Some(v) = &cli.input {
            config.input_root.clone_from(v);
        }
        if let Some(v) = &cli.output {
            config.output_root.clone_from(v);
        }
        if let Some(v) = &cli.log_prefix {
            config = config.with_log_prefix(v);
        }
        if let Some(v) = &cli.song_prefix {
            config = config.with_song_prefix(v);
        }
        if cli.region.is_some() {
            config.region.clone_from(&cli.region);
        }
        if let Some(v) = cli.compression {
            config = config.with_compression(v);
        }
        if cli.dedup_time_rows {
            config = config.with_time_dedup(true);
        }
        if let Some(v) = cli.pipeline {
            config = config.with_pipeline(v);
        }
        if cli.credentials.is_some() {
            credentials_path.clone_from(&cli.credentials);
        }

        config.validate()?;
        config.load_credentials(credentials_path.as_deref())?;
        Ok(config)
    }
}
