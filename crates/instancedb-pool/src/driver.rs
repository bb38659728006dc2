//! [`BackendDriver`] over a pool of raw string-store connections.

use std::collections::BTreeMap;

use async_trait::async_trait;
use instancedb::{
    BackendDriver, DbError, DbResult, DecodeMonitor, TypeSelection, Value, ValueType, leaf_name,
};

use crate::{
    codec::{unwrap, wrap},
    config::PoolDriverConfig,
    connection::{ConnectionPool, PooledConnection, StringConnection},
};

/// Pool-backed implementation of [`BackendDriver`].
///
/// Every primitive call borrows one connection for its duration. The
/// connection goes back to the pool when the call returns, fails or is
/// cancelled. Prefix reads cost two round trips: one `keys` scan and one
/// `mget`.
///
/// # Example
///
/// ```
/// use instancedb::{BackendDriver, Value, ValueType};
/// use instancedb_pool::{MemoryPool, PoolDriver, PoolDriverConfig};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let pool = MemoryPool::new(2);
/// let driver = PoolDriver::new(pool.clone(), PoolDriverConfig::default())?;
///
/// driver.set("default:result:invoker:inv:1:done", &Value::from(true), ValueType::Boolean).await?;
/// assert_eq!(pool.raw("default:result:invoker:inv:1:done").as_deref(), Some("true"));
///
/// let done = driver.get("default:result:invoker:inv:1:done", ValueType::Boolean).await?;
/// assert_eq!(done, Some(Value::from(true)));
/// assert_eq!(pool.in_use(), 0);
/// # Ok::<(), instancedb::DbError>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct PoolDriver<P> {
    pool: P,
    config: PoolDriverConfig,
    monitor: DecodeMonitor,
}

impl<P: ConnectionPool> PoolDriver<P> {
    /// Creates a driver over `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the configuration is invalid.
    pub fn new(pool: P, config: PoolDriverConfig) -> DbResult<Self> {
        config.validate()?;
        Ok(Self { pool, config, monitor: DecodeMonitor::new() })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Returns the driver configuration.
    pub fn config(&self) -> &PoolDriverConfig {
        &self.config
    }

    /// Borrows a connection, waiting at most the configured acquire timeout.
    async fn connection(&self) -> DbResult<PooledConnection<'_, P>> {
        let timeout = self.config.acquire_timeout;
        match tokio::time::timeout(timeout, self.pool.acquire()).await {
            Ok(Ok(connection)) => Ok(PooledConnection::new(&self.pool, connection)),
            Ok(Err(err)) => Err(err.into()),
            Err(_elapsed) => {
                tracing::warn!(
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "timed out waiting for a pooled connection"
                );
                Err(DbError::timeout())
            },
        }
    }

    fn decode(&self, key: &str, raw: String, value_type: ValueType) -> Value {
        self.monitor.settle(key, value_type, unwrap(raw, value_type))
    }
}

#[async_trait]
impl<P: ConnectionPool> BackendDriver for PoolDriver<P> {
    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &Value, value_type: ValueType) -> DbResult<()> {
        let raw = wrap(value, value_type)?;
        let mut connection = self.connection().await?;
        connection.set(key, raw).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str, value_type: ValueType) -> DbResult<Option<Value>> {
        let raw = self.connection().await?.get(key).await?;
        Ok(raw.map(|raw| self.decode(key, raw, value_type)))
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, key: &str) -> DbResult<()> {
        let mut connection = self.connection().await?;
        connection.del(&[key.to_owned()]).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove_all(&self, prefix: &str) -> DbResult<()> {
        let mut connection = self.connection().await?;
        let keys = connection.keys(prefix).await?;
        if keys.is_empty() {
            return Ok(());
        }

        let removed = connection.del(&keys).await?;
        tracing::debug!(removed, "removed keys by prefix");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> DbResult<Vec<String>> {
        let keys = self.connection().await?.keys(prefix).await?;
        Ok(keys.iter().map(|key| leaf_name(key).to_owned()).collect())
    }

    #[tracing::instrument(skip(self, types))]
    async fn get_all(
        &self,
        prefix: &str,
        types: &TypeSelection,
    ) -> DbResult<BTreeMap<String, Value>> {
        let mut connection = self.connection().await?;
        let keys = connection.keys(prefix).await?;
        if keys.is_empty() {
            return Ok(BTreeMap::new());
        }

        let raws = connection.mget(&keys).await?;
        drop(connection);

        let mut values = BTreeMap::new();
        for (key, raw) in keys.iter().zip(raws) {
            // Removed between the scan and the read.
            let Some(raw) = raw else { continue };
            let leaf = leaf_name(key);
            values.insert(leaf.to_owned(), self.decode(key, raw, types.for_name(leaf)));
        }

        Ok(values)
    }

    #[tracing::instrument(skip(self))]
    async fn health_check(&self) -> DbResult<()> {
        self.connection().await?.ping().await?;
        Ok(())
    }

    fn decode_failures(&self) -> u64 {
        self.monitor.failures()
    }
}
