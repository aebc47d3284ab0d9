//! Object storage access (S3, R2, GCS, Azure, local, in-memory)
//!
//! A [`Lake`] is a rooted location in an object store. The job reads its
//! inputs from one lake and writes its tables to another. Listings are
//! always recursive, so arbitrarily nested input partitions are found
//! without any wildcard gymnastics.

use crate::config::Credentials;
use crate::error::{Error, Result, ResultExt};
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::sync::Arc;

/// Maximum number of object reads in flight at once
const READ_CONCURRENCY: usize = 32;

/// Connection settings threaded to the cloud store builders
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// Explicit access keys; falls back to the builder's own discovery when absent
    pub credentials: Option<Credentials>,
    /// Bucket region
    pub region: Option<String>,
}

/// A rooted location in an object store
#[derive(Debug, Clone)]
pub struct Lake {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Base path prefix within the bucket/container
    prefix: ObjectPath,
    /// URL scheme for logging
    scheme: String,
    /// Bucket, container or local root, for logging
    root: String,
}

impl Lake {
    /// Open an existing location for reading.
    ///
    /// Supported formats:
    /// - `s3://bucket/path` or `s3a://bucket/path` - AWS S3
    /// - `r2://bucket/path` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket/path` - Google Cloud Storage
    /// - `az://container/path` - Azure Blob Storage
    /// - `memory://` - a fresh in-process store
    /// - `/local/path`, `./path` or `file:///path` - Local filesystem; must exist
    pub fn open(url: &str, options: &StorageOptions) -> Result<Self> {
        Self::parse(url, options, false)
    }

    /// Open a location for writing, creating a local root if needed
    pub fn open_output(url: &str, options: &StorageOptions) -> Result<Self> {
        Self::parse(url, options, true)
    }

    /// A fresh in-process store; clones share the same contents
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            prefix: ObjectPath::default(),
            scheme: "memory".to_string(),
            root: String::new(),
        }
    }

    /// Whether a URL points at an S3-compatible store that needs access keys
    pub fn needs_credentials(url: &str) -> bool {
        ["s3://", "s3a://", "r2://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
    }

    fn parse(url: &str, options: &StorageOptions, create: bool) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            Self::parse_s3(rest, "s3", options)
        } else if let Some(rest) = url.strip_prefix("s3a://") {
            Self::parse_s3(rest, "s3", options)
        } else if let Some(rest) = url.strip_prefix("r2://") {
            Self::parse_s3(rest, "r2", options)
        } else if let Some(rest) = url.strip_prefix("gs://") {
            Self::parse_gcs(rest)
        } else if let Some(rest) = url.strip_prefix("az://") {
            Self::parse_azure(rest)
        } else if let Some(rest) = url.strip_prefix("memory://") {
            let mut lake = Self::in_memory();
            lake.prefix = ObjectPath::from(rest);
            Ok(lake)
        } else {
            Self::parse_local(url, create)
        }
    }

    /// Parse S3 or R2 location (scheme already stripped)
    fn parse_s3(without_scheme: &str, scheme: &str, options: &StorageOptions) -> Result<Self> {
        let (bucket, prefix) = split_bucket(without_scheme);
        if bucket.is_empty() {
            return Err(Error::config(format!("Missing bucket in {scheme} URL")));
        }

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        if let Some(credentials) = &options.credentials {
            builder = builder
                .with_access_key_id(credentials.access_key_id())
                .with_secret_access_key(credentials.secret_access_key());
        }
        if let Some(region) = &options.region {
            builder = builder.with_region(region);
        }

        // R2 endpoint: https://<account_id>.r2.cloudflarestorage.com
        if scheme == "r2" {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: ObjectPath::from(prefix),
            scheme: scheme.to_string(),
            root: bucket.to_string(),
        })
    }

    /// Parse GCS location (scheme already stripped)
    fn parse_gcs(without_scheme: &str) -> Result<Self> {
        let (bucket, prefix) = split_bucket(without_scheme);

        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: ObjectPath::from(prefix),
            scheme: "gs".to_string(),
            root: bucket.to_string(),
        })
    }

    /// Parse Azure Blob location (scheme already stripped)
    fn parse_azure(without_scheme: &str) -> Result<Self> {
        let (container, prefix) = split_bucket(without_scheme);

        let store = MicrosoftAzureBuilder::from_env()
            .with_container_name(container)
            .build()
            .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: ObjectPath::from(prefix),
            scheme: "az".to_string(),
            root: container.to_string(),
        })
    }

    /// Parse local filesystem path
    fn parse_local(path: &str, create: bool) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        if create {
            std::fs::create_dir_all(path)
                .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;
        } else if !std::path::Path::new(path).is_dir() {
            return Err(Error::InputNotFound {
                path: path.to_string(),
            });
        }

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self {
            store: Arc::new(store),
            prefix: ObjectPath::default(),
            scheme: "file".to_string(),
            root: path.trim_end_matches('/').to_string(),
        })
    }

    /// Check if this is a cloud location (not local or in-memory)
    pub fn is_cloud(&self) -> bool {
        self.scheme != "file" && self.scheme != "memory"
    }

    /// Get the scheme (s3, r2, gs, az, file, memory)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Resolve a `/`-separated path relative to the lake root
    pub fn path(&self, relative: &str) -> ObjectPath {
        relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.prefix.clone(), |path, segment| path.child(segment))
    }

    /// Human-readable location of an object, for logging
    pub fn display(&self, path: &ObjectPath) -> String {
        match self.scheme.as_str() {
            "file" => format!("{}/{path}", self.root),
            "memory" => format!("memory://{path}"),
            scheme => format!("{scheme}://{}/{path}", self.root),
        }
    }

    /// List every object below `relative`, recursively, sorted by key
    pub async fn list(&self, relative: &str) -> Result<Vec<ObjectMeta>> {
        let prefix = self.path(relative);
        let mut objects: Vec<ObjectMeta> = self.store.list(Some(&prefix)).try_collect().await?;
        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }

    /// List the JSON data files below `relative`.
    ///
    /// Hidden and bookkeeping files (names starting with `.` or `_`) are
    /// skipped.
    pub async fn list_json(&self, relative: &str) -> Result<Vec<ObjectPath>> {
        Ok(self
            .list(relative)
            .await?
            .into_iter()
            .map(|meta| meta.location)
            .filter(|location| {
                location.filename().is_some_and(|name| {
                    !name.starts_with('.') && !name.starts_with('_') && name.ends_with(".json")
                })
            })
            .collect())
    }

    /// Read an object in full
    pub async fn read(&self, path: &ObjectPath) -> Result<Bytes> {
        let result = self
            .store
            .get(path)
            .await
            .with_context(|| format!("Failed to read {}", self.display(path)))?;
        result
            .bytes()
            .await
            .with_context(|| format!("Failed to read {}", self.display(path)))
    }

    /// Read many objects concurrently, preserving their order
    pub async fn read_all(&self, paths: Vec<ObjectPath>) -> Result<Vec<(ObjectPath, Bytes)>> {
        stream::iter(paths)
            .map(|path| async move {
                let data = self.read(&path).await?;
                Ok::<_, Error>((path, data))
            })
            .buffered(READ_CONCURRENCY)
            .try_collect()
            .await
    }

    /// Write bytes to an object, replacing any previous content
    pub async fn put(&self, path: &ObjectPath, data: Bytes) -> Result<()> {
        self.store
            .put(path, data.into())
            .await
            .map_err(|e| Error::output(format!("Failed to write {}: {e}", self.display(path))))?;
        Ok(())
    }

    /// Delete every object below `relative`, returning how many were removed
    pub async fn delete_prefix(&self, relative: &str) -> Result<usize> {
        let objects = self.list(relative).await?;
        for meta in &objects {
            self.store.delete(&meta.location).await.map_err(|e| {
                Error::output(format!(
                    "Failed to delete {}: {e}",
                    self.display(&meta.location)
                ))
            })?;
        }
        Ok(objects.len())
    }
}

/// Split `bucket/some/prefix` into its bucket and prefix
fn split_bucket(without_scheme: &str) -> (&str, &str) {
    match without_scheme.find('/') {
        Some(idx) => (&without_scheme[..idx], &without_scheme[idx + 1..]),
        None => (without_scheme, ""),
    }
}
