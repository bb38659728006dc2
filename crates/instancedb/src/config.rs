//! Configuration for an [`InstanceDb`](crate::InstanceDb) handle.
//!
//! [`InstanceDbConfig`] can be built in code through its validating builder
//! or deserialized from a configuration file. Deserialized values are
//! validated when the handle is created.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// Default key scope.
pub const DEFAULT_SCOPE: &str = "default";

/// Which backend driver a handle should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The embedded document store.
    #[default]
    Embedded,
    /// The networked string store behind a connection pool.
    Pool,
}

/// Handle configuration.
///
/// # Example
///
/// ```
/// use instancedb::{BackendKind, InstanceDbConfig};
///
/// let config = InstanceDbConfig::builder().scope("staging").force_pool(true).build()?;
/// assert_eq!(config.scope(), "staging");
/// assert_eq!(config.backend_kind(), BackendKind::Pool);
///
/// let from_file: InstanceDbConfig = serde_json::from_str(r#"{ "backend": "pool" }"#)?;
/// assert_eq!(from_file.scope(), "default");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceDbConfig {
    /// Namespace every key starts with.
    #[serde(default = "default_scope")]
    pub(crate) scope: String,

    /// Requested backend.
    #[serde(default)]
    pub(crate) backend: BackendKind,

    /// Use the pool backend regardless of `backend`.
    #[serde(default)]
    pub(crate) force_pool: bool,

    /// Default base64 preference for calls that do not set one.
    #[serde(default)]
    pub(crate) prefer_base64: bool,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_owned()
}

impl Default for InstanceDbConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            backend: BackendKind::default(),
            force_pool: false,
            prefer_base64: false,
        }
    }
}

#[bon::bon]
impl InstanceDbConfig {
    /// Creates a new configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `scope` is empty or contains `:`.
    #[builder]
    pub fn new(
        #[builder(into, default = default_scope())] scope: String,
        #[builder(default)] backend: BackendKind,
        #[builder(default)] force_pool: bool,
        #[builder(default)] prefer_base64: bool,
    ) -> DbResult<Self> {
        let config = Self { scope, backend, force_pool, prefer_base64 };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the builder enforces.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `scope` is empty or contains `:`.
    pub fn validate(&self) -> DbResult<()> {
        if self.scope.is_empty() {
            return Err(DbError::config("scope cannot be empty"));
        }
        if self.scope.contains(':') {
            return Err(DbError::config(format!(
                "scope `{}` must not contain the key separator `:`",
                self.scope
            )));
        }
        Ok(())
    }

    /// Returns the key scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the backend kind to use.
    ///
    /// `force_pool` overrides the requested backend.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        if self.force_pool { BackendKind::Pool } else { self.backend }
    }

    /// Returns the default base64 preference.
    #[must_use]
    pub fn prefer_base64(&self) -> bool {
        self.prefer_base64
    }
}
