//! Connection-pooled raw string-store driver for `instancedb`.
//!
//! This crate provides [`PoolDriver`], an implementation of the
//! [`BackendDriver`](instancedb::BackendDriver) contract for flat key/value
//! servers that only store strings. Values are rendered to strings by a
//! type-aware [`codec`] and every command runs on a connection borrowed from
//! a [`ConnectionPool`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         InstanceDb                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   PoolDriver<P>                             │
//! │   (implements BackendDriver, raw-string codec)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │   ConnectionPool::{acquire, release} → PooledConnection     │
//! ├─────────────────────────────────────────────────────────────┤
//! │   StringConnection::{set, get, del, keys, mget, ping}       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use instancedb::{Args, BackendKind, InstanceDbConfig, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InstanceDbConfig::builder().backend(BackendKind::Pool).build()?;
//!     let db = instancedb_pool::in_memory_db(config)?;
//!
//!     let args = Args::new().id("7").invoker("testinv").name("port").value(8080);
//!     db.parameters().set(&args).await?;
//!
//!     // Without a schema every field is text.
//!     let port = db.parameters().get(&args).await?;
//!     assert_eq!(port, Some(Value::from("8080")));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Command Mapping
//!
//! | `BackendDriver`  | Connection commands |
//! | ---------------- | ------------------- |
//! | `set(key, v)`    | `set(key, wrap(v))` |
//! | `get(key)`       | `get(key)`          |
//! | `remove(key)`    | `del([key])`        |
//! | `remove_all(p)`  | `keys(p)` + `del(keys)` |
//! | `list(p)`        | `keys(p)`           |
//! | `get_all(p)`     | `keys(p)` + `mget(keys)` |
//!
//! # Connection Handling
//!
//! Acquisition is bounded by [`PoolDriverConfig::acquire_timeout`]; when it
//! elapses the call fails with [`DbError::Timeout`](instancedb::DbError).
//! Connections are returned through [`PooledConnection`]'s `Drop`, so an
//! error or a cancelled future never leaks one.

pub mod codec;
mod config;
mod connection;
mod driver;
mod error;
mod memory;
/// Shared test utilities for pool driver testing.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

use std::sync::Arc;

use instancedb::{BackendKind, DbResult, InstanceDb, InstanceDbConfig};

/// Configuration types and defaults for the pool driver.
pub use config::{DEFAULT_ACQUIRE_TIMEOUT, PoolDriverConfig};
/// Engine traits and the releasing connection guard.
pub use connection::{ConnectionPool, PooledConnection, StringConnection};
/// Pool-backed driver.
pub use driver::PoolDriver;
/// Pool error types and result alias.
pub use error::{PoolError, PoolResult};
/// In-process pool double.
pub use memory::{DEFAULT_MAX_CONNECTIONS, MemoryConnection, MemoryPool};

/// Creates an in-memory handle for `config`, picking the engine by
/// [`InstanceDbConfig::backend_kind`].
///
/// The pool backend gets a fresh default-sized [`MemoryPool`] behind a
/// [`PoolDriver`]; the embedded backend gets
/// [`InstanceDb::in_memory`]'s document collection.
///
/// # Errors
///
/// Returns [`DbError::Config`](instancedb::DbError) if the configuration is
/// invalid.
pub fn in_memory_db(config: InstanceDbConfig) -> DbResult<InstanceDb> {
    match config.backend_kind() {
        BackendKind::Embedded => InstanceDb::in_memory(config),
        BackendKind::Pool => {
            let driver = PoolDriver::new(MemoryPool::default(), PoolDriverConfig::default())?;
            InstanceDb::builder().config(config).driver(Arc::new(driver)).build()
        },
    }
}
