//! In-memory backend for tests.

use crate::connector::Connector;
use crate::error::{ErrorKind, Result};
use crate::kv::{KeyValueStore, KvHandle};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    failing_keys: HashSet<String>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write to `key`.
    pub fn with_failing_key(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Snapshot of every entry, sorted by key.
    pub async fn entries(&self) -> BTreeMap<String, String> {
        self.entries.read().await.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Number of successful writes, overwrites included.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.failing_keys.contains(key) {
            exn::bail!(ErrorKind::Rejected(key.to_string()));
        }
        self.entries.write().await.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}

/// Hands out a shared [`MemoryStore`], counting connection attempts and
/// optionally refusing the first few.
#[derive(Debug)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    refusals: AtomicUsize,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store, refusals: AtomicUsize::new(0), attempts: AtomicUsize::new(0) }
    }

    /// Fail the next `count` connection attempts.
    pub fn refusing(self, count: usize) -> Self {
        self.refusals.store(count, Ordering::SeqCst);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<KvHandle> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self.refusals.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if refused {
            exn::bail!(ErrorKind::Connect("memory".to_string()));
        }
        let handle: KvHandle = self.store.clone();
        Ok(handle)
    }
}

#[async_trait]
impl Connector for Arc<MemoryConnector> {
    async fn connect(&self) -> Result<KvHandle> {
        self.as_ref().connect().await
    }
}
