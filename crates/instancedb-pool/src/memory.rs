//! In-process string store behind a bounded connection pool.
//!
//! [`MemoryPool`] stands in for a networked key/value server in tests and
//! local development. It hands out at most `max_connections` connections at
//! a time, keeps count of what was acquired and released, and can be told
//! to fail upcoming acquisitions or commands.

use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{
    connection::{ConnectionPool, StringConnection},
    error::{PoolError, PoolResult},
};

/// Default number of connections of a [`MemoryPool`].
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

type Store = Arc<RwLock<BTreeMap<String, String>>>;

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
    fail_acquires: AtomicUsize,
    fail_commands: AtomicUsize,
}

impl Counters {
    /// Consumes one injected failure from `budget`, if any is left.
    fn take(budget: &AtomicUsize) -> bool {
        budget.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

/// A bounded pool of connections to one shared in-memory store.
///
/// Clones share the store, the connection limit and the counters.
///
/// # Example
///
/// ```
/// use instancedb_pool::{ConnectionPool, MemoryPool, StringConnection};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let pool = MemoryPool::new(2);
/// let mut connection = pool.acquire().await?;
/// connection.set("k", "v".to_owned()).await?;
/// assert_eq!(connection.get("k").await?, Some("v".to_owned()));
/// pool.release(connection)?;
/// assert_eq!(pool.in_use(), 0);
/// # Ok::<(), instancedb_pool::PoolError>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryPool {
    store: Store,
    slots: Arc<Semaphore>,
    max_connections: usize,
    counters: Arc<Counters>,
}

impl MemoryPool {
    /// Creates a pool allowing `max_connections` concurrent connections.
    #[must_use]
    pub fn new(max_connections: usize) -> Self {
        Self {
            store: Arc::default(),
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            counters: Arc::default(),
        }
    }

    /// Maximum number of connections out at once.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Number of connections currently on loan.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }

    /// Total number of successful acquisitions.
    #[must_use]
    pub fn acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    /// Total number of connections handed back.
    #[must_use]
    pub fn released(&self) -> u64 {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Makes the next `count` acquisitions fail with [`PoolError::Acquire`].
    pub fn fail_next_acquires(&self, count: usize) {
        self.counters.fail_acquires.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` commands, on any connection, fail with
    /// [`PoolError::Transport`].
    pub fn fail_next_commands(&self, count: usize) {
        self.counters.fail_commands.store(count, Ordering::SeqCst);
    }

    /// Closes the pool. Waiting and future acquisitions fail with
    /// [`PoolError::Closed`].
    pub fn close(&self) {
        self.slots.close();
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// The raw string stored under `key`, bypassing the pool.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.store.read().get(key).cloned()
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

#[async_trait]
impl ConnectionPool for MemoryPool {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> PoolResult<MemoryConnection> {
        if Counters::take(&self.counters.fail_acquires) {
            return Err(PoolError::Acquire("injected acquisition failure".to_owned()));
        }

        let permit = Arc::clone(&self.slots).acquire_owned().await.map_err(|_| PoolError::Closed)?;
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryConnection {
            store: Arc::clone(&self.store),
            counters: Arc::clone(&self.counters),
            _permit: permit,
        })
    }

    fn release(&self, connection: MemoryConnection) -> PoolResult<()> {
        if !Arc::ptr_eq(&connection.store, &self.store) {
            return Err(PoolError::Release("connection belongs to another pool".to_owned()));
        }
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        drop(connection);
        Ok(())
    }
}

/// A connection handed out by [`MemoryPool`].
///
/// Holds one of the pool's slots until it is released or dropped.
#[derive(Debug)]
pub struct MemoryConnection {
    store: Store,
    counters: Arc<Counters>,
    _permit: OwnedSemaphorePermit,
}

impl MemoryConnection {
    fn check(&self) -> PoolResult<()> {
        if Counters::take(&self.counters.fail_commands) {
            return Err(PoolError::Transport("injected command failure".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl StringConnection for MemoryConnection {
    async fn set(&mut self, key: &str, value: String) -> PoolResult<()> {
        self.check()?;
        self.store.write().insert(key.to_owned(), value);
        Ok(())
    }

    async fn get(&mut self, key: &str) -> PoolResult<Option<String>> {
        self.check()?;
        Ok(self.store.read().get(key).cloned())
    }

    async fn del(&mut self, keys: &[String]) -> PoolResult<u64> {
        self.check()?;
        let mut store = self.store.write();
        let removed = keys.iter().filter(|key| store.remove(key.as_str()).is_some()).count();
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn keys(&mut self, prefix: &str) -> PoolResult<Vec<String>> {
        self.check()?;
        let store = self.store.read();
        Ok(store
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn mget(&mut self, keys: &[String]) -> PoolResult<Vec<Option<String>>> {
        self.check()?;
        let store = self.store.read();
        Ok(keys.iter().map(|key| store.get(key).cloned()).collect())
    }

    async fn ping(&mut self) -> PoolResult<()> {
        self.check()
    }
}
