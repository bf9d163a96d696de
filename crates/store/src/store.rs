//! Serializing, lazily-connected facade over a key-value backend.

use crate::connector::Connector;
use crate::error::{ErrorKind, Result};
use crate::kv::KvHandle;
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::instrument;

/// Persists serializable values under string keys.
///
/// The connection is opened on first use and then shared by every clone of
/// this store, so a run that never writes never connects. Concurrent first
/// callers wait on a single connection attempt; a failed attempt is not
/// remembered and the next call tries again.
///
/// Values are stored as text: a value that serializes to a JSON string is
/// written as that raw string, anything else as compact JSON.
#[derive(Clone)]
pub struct MetadataStore {
    connector: Arc<dyn Connector>,
    handle: Arc<OnceCell<KvHandle>>,
    namespace: Option<String>,
}

impl MetadataStore {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self { connector: Arc::new(connector), handle: Arc::new(OnceCell::new()), namespace: None }
    }

    /// Prefix every key with `"{namespace}:"`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into()).filter(|ns| !ns.is_empty());
        self
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    /// Connect if not already connected.
    pub async fn init(&self) -> Result<&KvHandle> {
        self.handle
            .get_or_try_init(|| async {
                let handle = self.connector.connect().await?;
                tracing::debug!(backend = handle.name(), "Metadata store connected");
                Ok::<_, crate::error::Error>(handle)
            })
            .await
    }

    fn key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match &self.namespace {
            Some(namespace) => Cow::Owned(format!("{namespace}:{key}")),
            None => Cow::Borrowed(key),
        }
    }

    /// Serialize `value` and write it under `key`.
    #[instrument(level = "trace", skip(self, value))]
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let text = encode(value).or_raise(|| ErrorKind::Serialize(key.to_string()))?;
        self.init().await?.set(&self.key(key), &text).await
    }

    /// Read and deserialize the value under `key`, or `None` if absent.
    ///
    /// Text that isn't valid JSON for `T` is retried as a plain JSON string,
    /// the inverse of how [`put`](Self::put) writes strings.
    #[instrument(level = "trace", skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(text) = self.init().await?.get(&self.key(key)).await? else {
            return Ok(None);
        };
        decode(text).map(Some).or_raise(|| ErrorKind::InvalidData(key.to_string()))
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("backend", &self.handle.get().map(|handle| handle.name()))
            .field("namespace", &self.namespace)
            .finish()
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    match serde_json::to_value(value)? {
        Value::String(text) => Ok(text),
        other => serde_json::to_string(&other),
    }
}

fn decode<T: DeserializeOwned>(text: String) -> serde_json::Result<T> {
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_value(Value::String(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KeyValueStore, MemoryConnector, MemoryStore};
    use glean_extract::{Metadata, fixtures};
    use rstest::rstest;
    use serde::Deserialize;
    use serde_json::json;

    fn memory_store() -> (Arc<MemoryStore>, Arc<MemoryConnector>, MetadataStore) {
        let backend = Arc::new(MemoryStore::new());
        let connector = Arc::new(MemoryConnector::new(backend.clone()));
        let store = MetadataStore::new(connector.clone());
        (backend, connector, store)
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let (_, _, store) = memory_store();
        let metadata = glean_extract::extract(fixtures::camera_jpeg("Canon", "EOS R5", 6)).unwrap();
        store.put("a.jpg", &metadata).await.unwrap();
        assert_eq!(store.get::<Metadata>("a.jpg").await.unwrap(), Some(metadata));
    }

    #[tokio::test]
    async fn test_absent_metadata_round_trip() {
        let (backend, _, store) = memory_store();
        store.put("b.jpg", &None::<Metadata>).await.unwrap();
        assert_eq!(backend.entries().await.get("b.jpg").map(String::as_str), Some("null"));
        assert_eq!(store.get::<Option<Metadata>>("b.jpg").await.unwrap(), Some(None));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (_, _, store) = memory_store();
        assert_eq!(store.get::<Metadata>("nope.jpg").await.unwrap(), None);
    }

    #[rstest]
    #[case(json!({"orientation": 1, "make": "Canon"}), r#"{"make":"Canon","orientation":1}"#)]
    #[case(json!([1, 2, 3]), "[1,2,3]")]
    #[case(json!(72.5), "72.5")]
    #[case(json!("plain text"), "plain text")]
    #[case(json!(null), "null")]
    #[tokio::test]
    async fn test_stored_text(#[case] value: serde_json::Value, #[case] expected: &str) {
        let (backend, _, store) = memory_store();
        store.put("key", &value).await.unwrap();
        assert_eq!(backend.entries().await.get("key").map(String::as_str), Some(expected));
        assert_eq!(store.get::<serde_json::Value>("key").await.unwrap(), Some(value));
    }

    #[rstest]
    #[case("hello world")]
    #[case("42")]
    #[case("null")]
    #[case("{not json")]
    #[tokio::test]
    async fn test_plain_strings_round_trip(#[case] text: &str) {
        let (_, _, store) = memory_store();
        store.put("key", text).await.unwrap();
        assert_eq!(store.get::<String>("key").await.unwrap().as_deref(), Some(text));
    }

    #[tokio::test]
    async fn test_undecodable_value() {
        #[derive(Debug, Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            width: u32,
        }
        let (backend, _, store) = memory_store();
        backend.set("key", r#"{"height":10}"#).await.unwrap();
        let err = store.get::<Strict>("key").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(key) if key == "key"));
    }

    #[tokio::test]
    async fn test_namespace() {
        let (backend, _, store) = memory_store();
        let store = store.with_namespace("photos");
        store.put("2024/a.jpg", &json!({"orientation": 1})).await.unwrap();
        assert!(backend.entries().await.contains_key("photos:2024/a.jpg"));
        assert_eq!(store.get::<serde_json::Value>("2024/a.jpg").await.unwrap(), Some(json!({"orientation": 1})));
    }

    #[tokio::test]
    async fn test_connects_lazily_and_once() {
        let (_, connector, store) = memory_store();
        assert!(!store.is_connected());
        assert_eq!(connector.attempts(), 0);

        let writes = (0..16).map(|i| {
            let store = store.clone();
            async move { store.put(&format!("{i}.jpg"), &json!(null)).await }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }
        assert!(store.is_connected());
        assert_eq!(connector.attempts(), 1);
        store.init().await.unwrap();
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_connection_is_retried() {
        let backend = Arc::new(MemoryStore::new());
        let connector = Arc::new(MemoryConnector::new(backend.clone()).refusing(1));
        let store = MetadataStore::new(connector.clone());

        let err = store.put("a.jpg", &json!(null)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Connect(_)));
        assert!(!store.is_connected());
        assert!(backend.entries().await.is_empty());

        store.put("a.jpg", &json!(null)).await.unwrap();
        assert_eq!(connector.attempts(), 2);
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_surfaces() {
        let backend = Arc::new(MemoryStore::new().with_failing_key("bad.jpg"));
        let store = MetadataStore::new(MemoryConnector::new(backend));
        let err = store.put("bad.jpg", &json!(null)).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Rejected(_)));
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let handle: KvHandle = Arc::new(crate::kv::SqliteStore::connect_in_memory().await.unwrap());
        let store = MetadataStore::new(handle);
        let metadata = glean_extract::extract(fixtures::camera_jpeg("Nikon", "Z 8", 3)).unwrap();
        store.put("c.jpg", &metadata).await.unwrap();
        assert_eq!(store.get::<Metadata>("c.jpg").await.unwrap(), Some(metadata));
    }
}
