//! Configuration for a job run
//!
//! Settings are layered once at startup: built-in defaults, then an optional
//! YAML job file, then command-line flags and environment variables. The
//! resulting [`EtlConfig`] is passed around by reference and never changed
//! afterwards.
//!
//! Access keys come from a separate INI-style credential file (`dl.cfg`):
//!
//! ```text
//! [AWS]
//! AWS_ACCESS_KEY_ID = AKIA...
//! AWS_SECRET_ACCESS_KEY = ...
//! ```

use crate::error::{Error, Result};
use crate::storage::{Lake, StorageOptions};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Default input location
pub const DEFAULT_INPUT_ROOT: &str = "s3a://udacity-dend";

/// Default output location
pub const DEFAULT_OUTPUT_ROOT: &str = "s3a://udacity-data-engineer-data-lake-project";

/// Default song metadata prefix under the input root
pub const DEFAULT_SONG_PREFIX: &str = "song_data";

/// Default event log prefix under the input root (one year/month)
pub const DEFAULT_LOG_PREFIX: &str = "log_data/2018/11";

/// Credential file looked up when none is named explicitly
pub const DEFAULT_CREDENTIALS_FILE: &str = "dl.cfg";

const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// `[section]`
static SECTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[([^\]]+)\]\s*$").unwrap());

/// `key = value` or `key: value`
static ENTRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9_.\-]+)\s*[=:]\s*(.*?)\s*$").unwrap());

// ============================================================================
// Enumerations
// ============================================================================

/// Parquet compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Snappy (default)
    #[default]
    Snappy,
    /// Zstandard
    Zstd,
    /// Gzip
    Gzip,
    /// No compression
    #[serde(rename = "none")]
    #[value(name = "none")]
    Uncompressed,
}

/// Which pipelines a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineSelection {
    /// Song pipeline, then log pipeline
    #[default]
    All,
    /// Songs and artists only
    Songs,
    /// Users, time and songplays only
    Logs,
}

impl PipelineSelection {
    /// Whether the song pipeline runs
    pub fn includes_songs(self) -> bool {
        matches!(self, Self::All | Self::Songs)
    }

    /// Whether the log pipeline runs
    pub fn includes_logs(self) -> bool {
        matches!(self, Self::All | Self::Logs)
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// S3 access keys
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
}

impl Credentials {
    /// Create credentials from explicit values
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Load credentials from an INI-style file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config(format!("Credential file '{}' not found", path.display()))
            } else {
                Error::config(format!(
                    "Failed to read credential file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::parse(&content)
    }

    /// Parse credential file content.
    ///
    /// Keys are matched case-insensitively in any section; the first
    /// occurrence wins. Lines starting with `#` or `;` are comments.
    pub fn parse(content: &str) -> Result<Self> {
        let mut access_key_id = None;
        let mut secret_access_key = None;

        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if SECTION_REGEX.is_match(trimmed) {
                continue;
            }

            let caps = ENTRY_REGEX.captures(trimmed).ok_or_else(|| {
                Error::config(format!(
                    "Malformed credential file at line {}: expected KEY = VALUE",
                    line_num + 1
                ))
            })?;
            let key = caps[1].to_ascii_uppercase();
            let value = unquote(&caps[2]).to_string();

            let slot = match key.as_str() {
                ACCESS_KEY_ID => &mut access_key_id,
                SECRET_ACCESS_KEY => &mut secret_access_key,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        let access_key_id = access_key_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::missing_field(ACCESS_KEY_ID))?;
        let secret_access_key = secret_access_key
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::missing_field(SECRET_ACCESS_KEY))?;

        Ok(Self::new(access_key_id, secret_access_key))
    }

    /// Access key id
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

// ============================================================================
// Job File
// ============================================================================

/// Optional YAML job file; every field overrides the built-in default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobFile {
    /// Input location URL
    pub input_root: Option<String>,
    /// Output location URL
    pub output_root: Option<String>,
    /// Song metadata prefix under the input root
    pub song_prefix: Option<String>,
    /// Event log prefix under the input root
    pub log_prefix: Option<String>,
    /// Credential file path
    pub credentials: Option<PathBuf>,
    /// Bucket region
    pub region: Option<String>,
    /// Parquet compression
    pub compression: Option<Codec>,
    /// Collapse time rows sharing a start_time
    pub dedup_time_rows: Option<bool>,
    /// Pipelines to run
    pub pipeline: Option<PipelineSelection>,
}

impl JobFile {
    /// Load a job file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read job file '{}': {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse a job file from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

// ============================================================================
// Resolved Config
// ============================================================================

/// Fully resolved settings of one run
#[derive(Debug, Clone, PartialEq)]
pub struct EtlConfig {
    /// Input location URL
    pub input_root: String,
    /// Output location URL
    pub output_root: String,
    /// Song metadata prefix under the input root
    pub song_prefix: String,
    /// Event log prefix under the input root
    pub log_prefix: String,
    /// Explicit S3 access keys
    pub credentials: Option<Credentials>,
    /// Bucket region
    pub region: Option<String>,
    /// Parquet compression
    pub compression: Codec,
    /// Collapse time rows sharing a start_time
    pub dedup_time_rows: bool,
    /// Pipelines to run
    pub pipeline: PipelineSelection,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            input_root: DEFAULT_INPUT_ROOT.to_string(),
            output_root: DEFAULT_OUTPUT_ROOT.to_string(),
            song_prefix: DEFAULT_SONG_PREFIX.to_string(),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            credentials: None,
            region: None,
            compression: Codec::default(),
            dedup_time_rows: false,
            pipeline: PipelineSelection::default(),
        }
    }
}

impl EtlConfig {
    /// Create a config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config reading from `input_root` and writing to `output_root`
    #[must_use]
    pub fn with_roots(input_root: impl Into<String>, output_root: impl Into<String>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    /// Overlay the values present in a job file
    #[must_use]
    pub fn merge_job_file(mut self, job: &JobFile) -> Self {
        if let Some(v) = &job.input_root {
            self.input_root.clone_from(v);
        }
        if let Some(v) = &job.output_root {
            self.output_root.clone_from(v);
        }
        if let Some(v) = &job.song_prefix {
            self.song_prefix.clone_from(v);
        }
        if let Some(v) = &job.log_prefix {
            self.log_prefix.clone_from(v);
        }
        if job.region.is_some() {
            self.region.clone_from(&job.region);
        }
        if let Some(v) = job.compression {
            self.compression = v;
        }
        if let Some(v) = job.dedup_time_rows {
            self.dedup_time_rows = v;
        }
        if let Some(v) = job.pipeline {
            self.pipeline = v;
        }
        self
    }

    /// Set explicit credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the event log prefix
    #[must_use]
    pub fn with_log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    /// Set the song metadata prefix
    #[must_use]
    pub fn with_song_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.song_prefix = prefix.into();
        self
    }

    /// Set the compression codec
    #[must_use]
    pub fn with_compression(mut self, codec: Codec) -> Self {
        self.compression = codec;
        self
    }

    /// Collapse or keep time rows sharing a start_time
    #[must_use]
    pub fn with_time_dedup(mut self, enabled: bool) -> Self {
        self.dedup_time_rows = enabled;
        self
    }

    /// Choose the pipelines to run
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineSelection) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Reject settings that cannot name a location
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("input_root", &self.input_root),
            ("output_root", &self.output_root),
            ("song_prefix", &self.song_prefix),
            ("log_prefix", &self.log_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_value(field, "must not be empty"));
            }
        }
        if self.input_root == self.output_root {
            return Err(Error::invalid_value(
                "output_root",
                "must differ from input_root",
            ));
        }
        Ok(())
    }

    /// Whether either location is an S3-compatible store
    pub fn needs_credentials(&self) -> bool {
        Lake::needs_credentials(&self.input_root) || Lake::needs_credentials(&self.output_root)
    }

    /// Load credentials before any storage is opened.
    ///
    /// An explicitly named file must exist. The default `dl.cfg` may be
    /// absent for purely local runs, but is required as soon as either
    /// location lives in S3.
    pub fn load_credentials(&mut self, explicit: Option<&Path>) -> Result<()> {
        if let Some(path) = explicit {
            self.credentials = Some(Credentials::from_file(path)?);
            return Ok(());
        }

        let default_path = Path::new(DEFAULT_CREDENTIALS_FILE);
        if default_path.is_file() {
            self.credentials = Some(Credentials::from_file(default_path)?);
        } else if self.needs_credentials() && self.credentials.is_none() {
            return Err(Error::config(format!(
                "Credential file '{DEFAULT_CREDENTIALS_FILE}' not found; it is required for S3 locations"
            )));
        }
        Ok(())
    }

    /// Storage settings derived from this config
    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            credentials: self.credentials.clone(),
            region: self.region.clone(),
        }
    }
}
