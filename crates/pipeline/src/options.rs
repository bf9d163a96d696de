use glean_storage::DEFAULT_HEAD_BYTES;
use std::num::NonZeroUsize;

/// Fetch-and-extract operations allowed in flight at once.
pub const DEFAULT_FETCH_CONCURRENCY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(3);
/// Store writes allowed in flight at once.
pub const DEFAULT_STORE_CONCURRENCY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(9);

/// Tuning for a single harvest run. Read once, at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Only enumerate keys starting with this prefix.
    pub prefix: Option<String>,
    /// Upper bound on concurrent fetch-and-extract operations.
    pub fetch_concurrency: NonZeroUsize,
    /// Upper bound on concurrent store writes, independent of
    /// `fetch_concurrency`.
    pub store_concurrency: NonZeroUsize,
    /// Leading bytes requested per object.
    pub head_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            store_concurrency: DEFAULT_STORE_CONCURRENCY,
            head_bytes: DEFAULT_HEAD_BYTES,
        }
    }
}

impl PipelineOptions {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into()).filter(|p| !p.is_empty());
        self
    }

    pub fn with_fetch_concurrency(mut self, limit: NonZeroUsize) -> Self {
        self.fetch_concurrency = limit;
        self
    }

    pub fn with_store_concurrency(mut self, limit: NonZeroUsize) -> Self {
        self.store_concurrency = limit;
        self
    }

    pub fn with_head_bytes(mut self, bytes: usize) -> Self {
        self.head_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PipelineOptions::default();
        assert_eq!(options.fetch_concurrency.get(), 4);
        assert_eq!(options.store_concurrency.get(), 10);
        assert_eq!(options.head_bytes, 8192);
        assert_eq!(options.prefix, None);
    }

    #[test]
    fn test_empty_prefix_means_everything() {
        assert_eq!(PipelineOptions::default().with_prefix("").prefix, None);
        assert_eq!(PipelineOptions::default().with_prefix("2024/").prefix.as_deref(), Some("2024/"));
    }
}
