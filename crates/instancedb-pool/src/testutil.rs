//! Shared test utilities for the pool driver.
//!
//! Feature-gated behind `testutil`. Pairs a [`MemoryPool`] with a
//! [`PoolDriver`] and with an [`InstanceDb`] using the sample schema of
//! [`instancedb::testutil`].

use std::{sync::Arc, time::Duration};

use instancedb::{InstanceDb, testutil::db_over};

use crate::{MemoryPool, PoolDriver, PoolDriverConfig};

/// Acquire timeout used by test drivers; short enough to keep timeout tests
/// fast.
pub const TEST_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

/// Creates a driver over `pool` with [`TEST_ACQUIRE_TIMEOUT`].
///
/// # Panics
///
/// Never in practice: the test configuration is valid.
pub fn driver_over(pool: &MemoryPool) -> PoolDriver<MemoryPool> {
    let config = PoolDriverConfig::builder()
        .acquire_timeout(TEST_ACQUIRE_TIMEOUT)
        .build()
        .expect("valid test configuration");
    PoolDriver::new(pool.clone(), config).expect("valid test configuration")
}

/// Creates a driver over a fresh default-sized [`MemoryPool`].
pub fn memory_driver() -> PoolDriver<MemoryPool> {
    driver_over(&MemoryPool::default())
}

/// Creates a façade handle over `pool` with the sample schema.
pub fn pool_db(pool: &MemoryPool) -> InstanceDb {
    db_over(Arc::new(driver_over(pool)))
}
