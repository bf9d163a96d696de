//! Key-value backends.
//!
//! A backend only ever sees text: serialization happens once, in
//! [`MetadataStore`](crate::MetadataStore), so every backend stores exactly
//! the same bytes for the same value.

#[cfg(any(test, feature = "mock"))]
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod sqlite;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::{MemoryConnector, MemoryStore};
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;
pub use self::sqlite::SqliteStore;

/// A text key-value store.
///
/// Implementations must be safe to call concurrently from many in-flight
/// futures through one shared handle.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name, for logging.
    fn name(&self) -> &str;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value under `key`, or `None` if it has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Shared handle to an open backend.
pub type KvHandle = Arc<dyn KeyValueStore>;
