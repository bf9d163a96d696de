use crate::error::{ErrorKind, Result};
use crate::models::{ExtractedItem, StoredRecord};
use crate::options::PipelineOptions;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use glean_storage::error::ErrorKind as StorageErrorKind;
use glean_storage::{BucketHandle, ObjectFetcher, ObjectRef};
use glean_store::MetadataStore;
use tracing::instrument;

/// Progress events emitted by [`Pipeline::harvest`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of objects enumerated.
/// 3. [`Stored`](Self::Stored) once per object, in completion order.
/// 4. [`Complete`](Self::Complete) exactly once.
///
/// An error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    Started,
    DiscoveryComplete(u64),
    /// An object's metadata has been written; `position` is its index in the
    /// enumeration.
    Stored { position: usize, record: StoredRecord },
    Complete,
}

/// Enumerates a bucket, extracts the metadata of every object from its
/// leading bytes, and writes it to a store.
///
/// Two stages run concurrently, each with its own bound: at most
/// `fetch_concurrency` fetch-and-extract operations and at most
/// `store_concurrency` writes are in flight at any instant. An object moves
/// on to the store stage as soon as its own extraction finishes.
pub struct Pipeline {
    bucket: BucketHandle,
    store: MetadataStore,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(bucket: BucketHandle, store: MetadataStore, options: PipelineOptions) -> Self {
        Self { bucket, store, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Run to completion and return every stored record in enumeration order.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Enumerate`] if the bucket cannot be listed.
    /// - [`ErrorKind::Store`] on the first write that fails (including
    ///   failing to connect to the store); remaining writes are abandoned.
    #[instrument(skip(self), fields(bucket = self.bucket.name(), prefix = ?self.options.prefix))]
    pub async fn run(&self) -> Result<Vec<StoredRecord>> {
        let mut stored = Vec::new();
        let events = self.harvest();
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            if let HarvestEvent::Stored { position, record } = event? {
                stored.push((position, record));
            }
        }
        stored.sort_unstable_by_key(|(position, _)| *position);
        let records: Vec<StoredRecord> = stored.into_iter().map(|(_, record)| record).collect();
        tracing::info!(
            objects = records.len(),
            with_metadata = records.iter().filter(|record| record.has_metadata()).count(),
            "Harvest complete",
        );
        Ok(records)
    }

    /// Stream [`HarvestEvent`]s while harvesting.
    pub fn harvest(&self) -> impl Stream<Item = Result<HarvestEvent>> + '_ {
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            yield Ok(HarvestEvent::Started);

            let objects = match self.bucket.list(self.options.prefix.as_deref()).await.or_raise(|| ErrorKind::Enumerate) {
                Ok(objects) => objects,
                Err(err) => {
                    yield Err(err);
                    return;
                },
            };
            tracing::debug!(objects = objects.len(), "Enumeration complete");
            yield Ok(HarvestEvent::DiscoveryComplete(u64::try_from(objects.len()).unwrap_or(u64::MAX)));

            let fetcher = ObjectFetcher::new(self.bucket.clone(), self.options.head_bytes);
            let written = futures::stream::iter(objects.into_iter().enumerate())
                .map(|(position, object)| {
                    let fetcher = fetcher.clone();
                    async move { (position, fetch_and_extract(&fetcher, object).await) }
                })
                .buffer_unordered(self.options.fetch_concurrency.get())
                .map(|(position, item)| {
                    let store = self.store.clone();
                    async move { store_item(&store, item).await.map(|record| (position, record)) }
                })
                .buffer_unordered(self.options.store_concurrency.get());
            futures::pin_mut!(written);

            while let Some(result) = written.next().await {
                match result {
                    Ok((position, record)) => yield Ok(HarvestEvent::Stored { position, record }),
                    Err(err) => {
                        // Dropping `written` abandons every in-flight operation.
                        yield Err(err);
                        return;
                    },
                }
            }

            yield Ok(HarvestEvent::Complete);
        })
    }
}

/// Never fails: a fetch error is logged and becomes absent metadata, and
/// [`glean_extract::extract`] already reports its own failures as `None`.
async fn fetch_and_extract(fetcher: &ObjectFetcher, object: ObjectRef) -> ExtractedItem {
    let metadata = match fetcher.fetch(&object.key).await {
        Ok(fetched) => glean_extract::extract(&fetched.bytes),
        Err(err) => {
            let reason: &StorageErrorKind = &err;
            tracing::warn!(key = %object.key, %reason, "Fetch failed, recording absent metadata");
            None
        },
    };
    ExtractedItem { key: object.key, metadata }
}

async fn store_item(store: &MetadataStore, item: ExtractedItem) -> Result<StoredRecord> {
    store.put(&item.key, &item.metadata).await.or_raise(|| ErrorKind::Store(item.key.clone()))?;
    tracing::trace!(key = %item.key, present = item.metadata.is_some(), "Stored metadata");
    Ok(item.into())
}
