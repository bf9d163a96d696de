use crate::error::{ErrorKind, Result};
use crate::kv::KeyValueStore;
use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use exn::ResultExt;
use tracing::instrument;

/// Redis-backed key-value store.
///
/// Holds one multiplexed connection; each call works on a cheap clone of it,
/// so any number of in-flight writes share a single socket.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Open a connection to `url` and check it with a `PING`.
    #[instrument(skip(url))]
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).or_raise(|| ErrorKind::Connect("redis".to_string()))?;
        let mut connection =
            client.get_multiplexed_async_connection().await.or_raise(|| ErrorKind::Connect("redis".to_string()))?;
        let _: String = ::redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .or_raise(|| ErrorKind::Connect("redis".to_string()))?;
        tracing::debug!("Connected to Redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: () = connection.set(key, value).await.or_raise(|| ErrorKind::Redis)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        connection.get(key).await.or_raise(|| ErrorKind::Redis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_a_connect_error() {
        let err = RedisStore::connect("not a url").await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Connect(backend) if backend == "redis"));
    }
}
