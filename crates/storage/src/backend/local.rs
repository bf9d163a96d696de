//! Local directory bucket.
//!
//! Treats a directory on the local filesystem as a bucket: every regular file
//! below the root is an object, keyed by its `/`-separated relative path.
//! Handy for harvesting a mounted share or a test fixture directory without
//! an object store.

use crate::backend::ObjectRefStream;
use crate::error::{ErrorKind, Result};
use crate::models::ObjectRef;
use crate::path::{to_key, validate as validate_key};
use crate::Bucket;
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tokio::io::AsyncReadExt;

enum WalkEntry {
    Object(ObjectRef),
    Descend(PathBuf),
    Skip,
}

/// Local directory bucket.
///
/// # Examples
///
/// ```no_run
/// use glean_storage::backend::LocalBucket;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bucket = LocalBucket::new("nas", "/mnt/photos")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBucket {
    name: String,
    root: PathBuf,
}
impl LocalBucket {
    /// Create a new local bucket rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or is not an existing directory. Unlike a writable store, a
    /// harvest source is never created on demand.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_key(key)?))
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Classify one directory entry. Keeps `?` usable; the stream loop below
    /// can only yield.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&str>) -> Result<WalkEntry> {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(ErrorKind::Io)?;
        let relative = path.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{}` is not within root `{}`", path.display(), self.root.display()))
        })?;
        if file_type.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if !file_type.is_file() {
            // Note: symlinks and sockets are not objects.
            return Ok(WalkEntry::Skip);
        }
        let key = to_key(relative)?;
        if let Some(prefix) = prefix
            && !key.starts_with(prefix)
        {
            return Ok(WalkEntry::Skip);
        }
        Ok(WalkEntry::Object(ObjectRef::new(key)))
    }
}

#[async_trait]
impl Bucket for LocalBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> ObjectRefStream<'a> {
        let mut stack = vec![self.root.clone()];
        Box::pin(stream! {
            // Directory order is filesystem-dependent; sort each directory so
            // that repeated runs enumerate in the same order. Only an unreadable
            // root fails the listing; anything below it is skipped with a warning.
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if current == self.root => {
                        yield Err(exn::Exn::from(ErrorKind::Io(err)));
                        return;
                    },
                    Err(err) => {
                        tracing::warn!(path = %current.display(), error = %err, "Skipping unreadable directory");
                        continue 'dirs;
                    },
                };
                let mut objects = Vec::new();
                let mut descend = Vec::new();
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(err) => {
                            tracing::warn!(path = %current.display(), error = %err, "Directory listing interrupted");
                            break 'entries;
                        },
                    };
                    let path = entry.path();
                    match self.process_entry(entry, prefix).await {
                        Ok(WalkEntry::Object(object)) => objects.push(object),
                        Ok(WalkEntry::Descend(dir)) => descend.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(err) => {
                            let reason: &ErrorKind = &err;
                            tracing::warn!(path = %path.display(), %reason, "Skipping malformed entry");
                        },
                    }
                }
                objects.sort_by(|a, b| a.key.cmp(&b.key));
                for object in objects {
                    yield Ok(object);
                }
                // Reverse so the stack pops subdirectories in ascending order.
                descend.sort();
                stack.extend(descend.into_iter().rev());
            }
        })
    }

    async fn read_head(&self, key: &str, bytes: usize) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        let mut buffer = Vec::with_capacity(bytes);
        file.take(bytes as u64).read_to_end(&mut buffer).await.map_err(ErrorKind::Io)?;
        Ok(buffer)
    }
}
