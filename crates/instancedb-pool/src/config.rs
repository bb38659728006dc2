//! Configuration for the pool driver.

use std::time::Duration;

use instancedb::{DbError, DbResult};
use serde::{Deserialize, Serialize};

/// Default bound on waiting for a pooled connection (5 seconds).
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`PoolDriver`](crate::PoolDriver).
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use instancedb_pool::PoolDriverConfig;
///
/// let config = PoolDriverConfig::builder()
///     .acquire_timeout(Duration::from_millis(250))
///     .build()?;
/// assert_eq!(config.acquire_timeout(), Duration::from_millis(250));
///
/// let parsed: PoolDriverConfig = serde_json::from_str(r#"{ "acquire_timeout": "2s" }"#)?;
/// assert_eq!(parsed.acquire_timeout(), Duration::from_secs(2));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolDriverConfig {
    /// How long a call may wait for a free connection.
    #[serde(with = "humantime_serde", default = "default_acquire_timeout")]
    pub(crate) acquire_timeout: Duration,
}

fn default_acquire_timeout() -> Duration {
    DEFAULT_ACQUIRE_TIMEOUT
}

impl Default for PoolDriverConfig {
    fn default() -> Self {
        Self { acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT }
    }
}

#[bon::bon]
impl PoolDriverConfig {
    /// Creates a validated configuration.
    ///
    /// # Optional Fields
    ///
    /// * `acquire_timeout` - Bound on waiting for a connection (default: 5 seconds).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `acquire_timeout` is zero.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_ACQUIRE_TIMEOUT)] acquire_timeout: Duration,
    ) -> DbResult<Self> {
        let config = Self { acquire_timeout };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration, for values that bypassed the builder.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `acquire_timeout` is zero.
    pub fn validate(&self) -> DbResult<()> {
        if self.acquire_timeout.is_zero() {
            return Err(DbError::config("acquire_timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Bound on waiting for a pooled connection.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}
