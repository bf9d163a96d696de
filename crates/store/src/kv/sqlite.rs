//! SQLite backend, one `entries` table keyed by string.

use crate::error::{ErrorKind, Result};
use crate::kv::KeyValueStore;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connection-pooled SQLite key-value store.
///
/// The pool is sized by the caller to the number of writes it will have in
/// flight, so no write ever waits on another for a connection. WAL mode lets
/// readers (the verification pass) proceed alongside them.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    async fn new(options: SqliteConnectOptions, pool_options: SqlitePoolOptions) -> Result<Self> {
        let pool = pool_options
            // Per-connection PRAGMAs must be applied to every pooled
            // connection, not just the first.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Connect("sqlite".to_string()))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (creating if needed) the database file at `path`, with a pool of
    /// up to `max_connections` connections.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Connect("sqlite".to_string()))?;
        }
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, SqlitePoolOptions::new().max_connections(max_connections.max(1))).await
    }

    /// Connect to an in-memory database.
    ///
    /// In-memory databases are per-connection, so the pool holds exactly one
    /// connection and never recycles it; a replacement would start empty.
    /// Not behind `#[cfg(test)]` so other crates' tests can use it.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        let pool_options = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<std::time::Duration>)
            .max_lifetime(None::<std::time::Duration>);
        Self::new(options, pool_options).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Many concurrent upserts against a single WAL writer.
            .busy_timeout(std::time::Duration::from_millis(5000))
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 1000;
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of stored entries.
    pub async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../../queries/count_entries.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Wait for all connections to be returned, then close them.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(include_str!("../../queries/upsert_entry.sql"))
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar(include_str!("../../queries/get_entry.sql"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }
}
