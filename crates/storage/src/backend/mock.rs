//! In-memory bucket for testing.

use super::ObjectRefStream;
use crate::Bucket;
use crate::error::{ErrorKind, Result};
use crate::models::ObjectRef;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory bucket for testing.
///
/// Objects live in a [`BTreeMap`] behind a [`RwLock`], so listing order is
/// the lexicographic key order. Individual keys can be made to fail on read,
/// and the listing itself can be made to fail, to exercise error paths
/// without a network. Reads are counted so tests can assert that nothing was
/// fetched.
///
/// # Examples
///
/// ```
/// use glean_storage::{Bucket, backend::MockBucket};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bucket = MockBucket::with_objects([
///     ("a.jpg", b"\xFF\xD8\xFF".to_vec()),
/// ]);
/// assert_eq!(bucket.list(None).await?.len(), 1);
/// assert_eq!(bucket.read_head("a.jpg", 2).await?, b"\xFF\xD8");
/// # Ok(())
/// # }
/// ```
pub struct MockBucket {
    name: String,
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    failing_keys: HashSet<String>,
    failing_listing: bool,
    reads: AtomicUsize,
}

impl MockBucket {
    /// Create a mock bucket pre-populated with objects.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        Self {
            name: "mock".to_string(),
            objects: RwLock::new(objects.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
            failing_keys: HashSet::new(),
            failing_listing: false,
            reads: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock bucket.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reads of `key` fail with a [`Network`](ErrorKind::Network) error.
    /// The key is still listed.
    pub fn with_failing_key(mut self, key: impl Into<String>) -> Self {
        self.failing_keys.insert(key.into());
        self
    }

    /// Listing fails with a [`PermissionDenied`](ErrorKind::PermissionDenied)
    /// error, as an unauthorised bucket would.
    pub fn with_failing_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    /// Add or replace an object.
    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(key.into(), data.into());
    }

    /// Number of [`read_head`](Bucket::read_head) calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}
impl Default for MockBucket {
    fn default() -> Self {
        let objects: [(&str, Vec<u8>); 0] = [];
        Self::with_objects(objects)
    }
}

#[async_trait]
impl Bucket for MockBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> ObjectRefStream<'a> {
        Box::pin(stream! {
            if self.failing_listing {
                yield Err(exn::Exn::from(ErrorKind::PermissionDenied(self.name.clone())));
                return;
            }
            // Snapshot under the read lock, then drop it before yielding.
            let keys: Vec<String> = {
                let guard = self.objects.read().await;
                guard
                    .keys()
                    .filter(|key| prefix.is_none_or(|p| key.starts_with(p)))
                    .cloned()
                    .collect()
            };
            for key in keys {
                yield Ok(ObjectRef::new(key));
            }
        })
    }

    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_keys.contains(key) {
            exn::bail!(ErrorKind::Network(format!("connection reset while reading {key}")));
        }
        let guard = self.objects.read().await;
        let data = guard.get(key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.to_string())))?;
        let end = bytes.min(data.len());
        Ok(data[..end].to_vec())
    }
}
