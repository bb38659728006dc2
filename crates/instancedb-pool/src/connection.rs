//! Engine seam of the pool driver.
//!
//! A [`ConnectionPool`] hands out [`StringConnection`]s to a flat
//! string-to-string store. The driver never holds a bare connection:
//! [`PooledConnection`] returns it to the pool when dropped, whether the
//! call succeeded, failed or was cancelled mid-await.

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use async_trait::async_trait;

use crate::error::PoolResult;

/// One connection to a raw string store.
///
/// Commands mirror the subset of a key/value server the driver needs.
/// `keys` matches a literal prefix; engines whose native scan takes a glob
/// pattern must escape the prefix before appending `*`.
#[async_trait]
pub trait StringConnection: Send {
    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&mut self, key: &str, value: String) -> PoolResult<()>;

    /// Reads the value stored under `key`.
    async fn get(&mut self, key: &str) -> PoolResult<Option<String>>;

    /// Deletes every listed key and returns how many existed.
    async fn del(&mut self, keys: &[String]) -> PoolResult<u64>;

    /// Returns every key starting with `prefix`, in no particular order.
    async fn keys(&mut self, prefix: &str) -> PoolResult<Vec<String>>;

    /// Reads several keys in one round trip. The answer is positional.
    async fn mget(&mut self, keys: &[String]) -> PoolResult<Vec<Option<String>>>;

    /// Checks that the connection is alive.
    async fn ping(&mut self) -> PoolResult<()>;
}

/// A pool of [`StringConnection`]s.
#[async_trait]
pub trait ConnectionPool: Send + Sync + fmt::Debug {
    /// The connection type handed out.
    type Connection: StringConnection + 'static;

    /// Waits for a free connection.
    async fn acquire(&self) -> PoolResult<Self::Connection>;

    /// Returns a connection to the pool.
    ///
    /// Called from [`Drop`], so it must not block.
    fn release(&self, connection: Self::Connection) -> PoolResult<()>;
}

/// A connection on loan from a pool.
///
/// Dereferences to the connection and releases it on drop. A failed
/// release is logged, never propagated.
pub struct PooledConnection<'a, P: ConnectionPool> {
    pool: &'a P,
    connection: Option<P::Connection>,
}

impl<'a, P: ConnectionPool> PooledConnection<'a, P> {
    /// Wraps a connection acquired from `pool`.
    pub fn new(pool: &'a P, connection: P::Connection) -> Self {
        Self { pool, connection: Some(connection) }
    }
}

impl<P: ConnectionPool> Deref for PooledConnection<'_, P> {
    type Target = P::Connection;

    #[allow(clippy::expect_used)]
    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the connection out.
        self.connection.as_ref().expect("connection present until drop")
    }
}

impl<P: ConnectionPool> DerefMut for PooledConnection<'_, P> {
    #[allow(clippy::expect_used)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection.as_mut().expect("connection present until drop")
    }
}

impl<P: ConnectionPool> Drop for PooledConnection<'_, P> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err(err) = self.pool.release(connection) {
                tracing::warn!(error = %err, "failed to release pooled connection");
            }
        }
    }
}

impl<P: ConnectionPool> fmt::Debug for PooledConnection<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("pool", &self.pool)
            .field("held", &self.connection.is_some())
            .finish()
    }
}
