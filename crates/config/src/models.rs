use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use glean_pipeline::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_STORE_CONCURRENCY, PipelineOptions};
use glean_storage::DEFAULT_HEAD_BYTES;
use glean_store::StoreOptions;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub bucket: BucketConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Where objects are enumerated and fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BucketConfig {
    S3 {
        bucket: String,
        #[serde(default = "default_region")]
        region: String,
        /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
        #[serde(default)]
        endpoint: Option<String>,
        access_key_id: String,
        secret_access_key: String,
        /// Key prefix treated as the bucket root.
        #[serde(default)]
        root: Option<String>,
    },
    /// A directory tree standing in for a bucket.
    Local { root: PathBuf },
}

impl BucketConfig {
    /// Name used in logs.
    pub fn name(&self) -> String {
        match self {
            Self::S3 { bucket, .. } => bucket.clone(),
            Self::Local { root } => root.display().to_string(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    /// In-memory SQLite, discarded on exit.
    Memory,
    Redis,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// SQLite database file; defaults to the user data directory.
    pub path: Option<PathBuf>,
    /// Redis connection URL.
    pub url: Option<String>,
    /// Prefix every stored key with `"{namespace}:"`.
    pub namespace: Option<String>,
}

impl StoreConfig {
    /// Connection parameters for the selected backend. SQLite pools are
    /// sized to `max_connections`, the number of concurrent writes.
    pub fn options(&self, max_connections: NonZeroUsize) -> Result<StoreOptions> {
        Ok(match self.kind {
            StoreKind::Sqlite => {
                let path = match &self.path {
                    Some(path) => path.clone(),
                    None => crate::default_database_path().ok_or_raise(|| ErrorKind::Missing("store.path"))?,
                };
                let max_connections = u32::try_from(max_connections.get()).unwrap_or(u32::MAX);
                StoreOptions::Sqlite { path, max_connections }
            },
            StoreKind::Memory => StoreOptions::SqliteInMemory,
            StoreKind::Redis => {
                let url = self.url.clone().filter(|url| !url.is_empty());
                StoreOptions::Redis { url: url.ok_or_raise(|| ErrorKind::Missing("store.url"))? }
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub prefix: Option<String>,
    pub fetch_concurrency: NonZeroUsize,
    pub store_concurrency: NonZeroUsize,
    pub head_bytes: usize,
    /// Re-read every stored key after the run.
    pub verify: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            store_concurrency: DEFAULT_STORE_CONCURRENCY,
            head_bytes: DEFAULT_HEAD_BYTES,
            verify: false,
        }
    }
}

impl PipelineConfig {
    pub fn options(&self) -> PipelineOptions {
        let options = PipelineOptions::default()
            .with_fetch_concurrency(self.fetch_concurrency)
            .with_store_concurrency(self.store_concurrency)
            .with_head_bytes(self.head_bytes);
        match &self.prefix {
            Some(prefix) => options.with_prefix(prefix.clone()),
            None => options,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Text }
    }
}
