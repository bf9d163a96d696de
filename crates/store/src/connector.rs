use crate::error::Result;
use crate::kv::{KvHandle, SqliteStore};
use async_trait::async_trait;
use std::path::PathBuf;

/// Opens a backend on demand.
///
/// [`MetadataStore`](crate::MetadataStore) holds a connector rather than a
/// connection so that nothing is opened until the first write.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<KvHandle>;
}

/// An already-open backend connects to itself.
#[async_trait]
impl Connector for KvHandle {
    async fn connect(&self) -> Result<KvHandle> {
        Ok(self.clone())
    }
}

/// Backend selection and connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOptions {
    Sqlite { path: PathBuf, max_connections: u32 },
    SqliteInMemory,
    Redis { url: String },
}

impl StoreOptions {
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } | Self::SqliteInMemory => "sqlite",
            Self::Redis { .. } => "redis",
        }
    }
}

#[async_trait]
impl Connector for StoreOptions {
    async fn connect(&self) -> Result<KvHandle> {
        tracing::debug!(backend = self.backend(), "Connecting to metadata store");
        let handle: KvHandle = match self {
            Self::Sqlite { path, max_connections } => std::sync::Arc::new(SqliteStore::connect(path, *max_connections).await?),
            Self::SqliteInMemory => std::sync::Arc::new(SqliteStore::connect_in_memory().await?),
            #[cfg(feature = "redis")]
            Self::Redis { url } => std::sync::Arc::new(crate::kv::RedisStore::connect(url).await?),
            #[cfg(not(feature = "redis"))]
            Self::Redis { .. } => exn::bail!(crate::error::ErrorKind::Unsupported("redis")),
        };
        Ok(handle)
    }
}
