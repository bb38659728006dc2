//! Backend driver trait definition.
//!
//! [`BackendDriver`] is the uniform contract both storage drivers implement:
//! a flat string key space, prefix scans, and a serialization [`ValueType`]
//! tag on every value. The façades only ever talk to this trait, so the
//! driver is an injected strategy selected by configuration.
//!
//! # Implementing a Driver
//!
//! 1. Implement the [`BackendDriver`] trait
//! 2. Give the driver its own wrap/unwrap codec for its native value model
//! 3. Map engine-specific errors to [`DbError`](crate::DbError)
//! 4. Run the [`conformance`](crate::conformance) suite against it
//!
//! See [`DocumentDriver`](crate::DocumentDriver) for a reference
//! implementation.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::DbResult,
    schema::TypeSelection,
    types::{Value, ValueType},
};

/// Storage driver over a flat, prefix-scannable key space.
///
/// Drivers are expected to be thread-safe (`Send + Sync`). Operations may
/// suspend on I/O; none of them retries.
///
/// # Key Operations
///
/// | Method | Description |
/// |--------|-------------|
/// | [`set`](BackendDriver::set) | Upsert one typed value |
/// | [`get`](BackendDriver::get) | Read one typed value |
/// | [`remove`](BackendDriver::remove) | Delete one key |
/// | [`remove_all`](BackendDriver::remove_all) | Delete every key under a prefix |
/// | [`list`](BackendDriver::list) | Leaf names under a prefix |
/// | [`get_all`](BackendDriver::get_all) | Leaf name → decoded value under a prefix |
#[async_trait]
pub trait BackendDriver: Send + Sync + std::fmt::Debug {
    /// Stores `value` at `key`, encoded as `value_type`.
    ///
    /// Overwrites an existing value. The write is atomic per key: a
    /// concurrent reader sees the old value or the new one, never a mix.
    ///
    /// # Errors
    ///
    /// [`DbError::Serialization`](crate::DbError::Serialization) if the value
    /// cannot be encoded, or the engine's failure.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn set(&self, key: &str, value: &Value, value_type: ValueType) -> DbResult<()>;

    /// Reads the value at `key`, decoded as `value_type`.
    ///
    /// Returns `Ok(None)` when the key does not exist. A payload that does
    /// not decode is returned raw rather than failing.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get(&self, key: &str, value_type: ValueType) -> DbResult<Option<Value>>;

    /// Deletes `key`. Deleting a missing key is a no-op.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn remove(&self, key: &str) -> DbResult<()>;

    /// Deletes every key that starts with `prefix`. A no-op when nothing
    /// matches.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn remove_all(&self, prefix: &str) -> DbResult<()>;

    /// Returns the leaf name of every key that starts with `prefix`, in no
    /// particular order.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn list(&self, prefix: &str) -> DbResult<Vec<String>>;

    /// Returns leaf name → decoded value for every key under `prefix`.
    ///
    /// Each leaf is decoded with `types.for_name(leaf)`.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get_all(
        &self,
        prefix: &str,
        types: &TypeSelection,
    ) -> DbResult<BTreeMap<String, Value>>;

    /// Checks that the engine is reachable.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn health_check(&self) -> DbResult<()>;

    /// Number of reads so far that returned a raw payload because it did not
    /// decode as its declared type.
    fn decode_failures(&self) -> u64;
}

#[async_trait]
impl<D: BackendDriver + ?Sized> BackendDriver for Arc<D> {
    async fn set(&self, key: &str, value: &Value, value_type: ValueType) -> DbResult<()> {
        (**self).set(key, value, value_type).await
    }

    async fn get(&self, key: &str, value_type: ValueType) -> DbResult<Option<Value>> {
        (**self).get(key, value_type).await
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        (**self).remove(key).await
    }

    async fn remove_all(&self, prefix: &str) -> DbResult<()> {
        (**self).remove_all(prefix).await
    }

    async fn list(&self, prefix: &str) -> DbResult<Vec<String>> {
        (**self).list(prefix).await
    }

    async fn get_all(
        &self,
        prefix: &str,
        types: &TypeSelection,
    ) -> DbResult<BTreeMap<String, Value>> {
        (**self).get_all(prefix, types).await
    }

    async fn health_check(&self) -> DbResult<()> {
        (**self).health_check().await
    }

    fn decode_failures(&self) -> u64 {
        (**self).decode_failures()
    }
}
