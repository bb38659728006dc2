//! The [`InstanceDb`] handle.

use std::sync::Arc;

use crate::{
    args::Args,
    config::{BackendKind, InstanceDbConfig},
    document::DocumentDriver,
    driver::BackendDriver,
    error::{DbError, DbResult},
    fields::Fields,
    instances::Instances,
    keys::KeySpace,
    memory::MemoryCollection,
    schema::{ApiSchema, TypeResolver},
    types::FieldKind,
};

/// Entry point to instance, parameter and result storage.
///
/// A handle bundles the configuration, the key space of its scope, the
/// type resolver and one injected [`BackendDriver`]. Cloning is cheap and
/// every clone shares the same driver.
///
/// # Example
///
/// ```
/// use instancedb::{Args, InstanceDb, InstanceDbConfig, Value};
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let db = InstanceDb::in_memory(InstanceDbConfig::default())?;
///
/// let args = Args::new()
///     .id("2")
///     .invoker("testinv")
///     .instance(json!({ "status": "running", "parameters": { "foo": "bar" } }));
/// db.instances().set(&args).await?;
///
/// let foo = db.parameters().get(&Args::new().id("2").invoker("testinv").name("foo")).await?;
/// assert_eq!(foo, Some(Value::from("bar")));
/// # Ok::<(), instancedb::DbError>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct InstanceDb {
    config: InstanceDbConfig,
    keys: KeySpace,
    resolver: TypeResolver,
    driver: Arc<dyn BackendDriver>,
}

#[bon::bon]
impl InstanceDb {
    /// Creates a handle over an injected driver.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated before use.
    /// * `driver` - The storage driver all façades delegate to.
    /// * `schema` - Declared field types. Without one, every field is text.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the configuration is invalid.
    #[builder]
    pub fn new(
        #[builder(default)] config: InstanceDbConfig,
        driver: Arc<dyn BackendDriver>,
        schema: Option<ApiSchema>,
    ) -> DbResult<Self> {
        config.validate()?;
        Ok(Self {
            keys: KeySpace::new(config.scope()),
            resolver: TypeResolver::new(schema.map(Arc::new)),
            config,
            driver,
        })
    }

    /// Creates a handle over a fresh [`MemoryCollection`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the configuration is invalid or selects
    /// the pool backend, whose in-memory double lives in the pool driver
    /// crate.
    pub fn in_memory(config: InstanceDbConfig) -> DbResult<Self> {
        match config.backend_kind() {
            BackendKind::Embedded => Self::builder()
                .config(config)
                .driver(Arc::new(DocumentDriver::new(MemoryCollection::new())))
                .build(),
            BackendKind::Pool => Err(DbError::config(
                "the pool backend has no in-memory engine in this crate; use the pool driver crate",
            )),
        }
    }

    /// Instance operations.
    #[must_use]
    pub fn instances(&self) -> Instances<'_> {
        Instances::new(self)
    }

    /// Parameter operations.
    #[must_use]
    pub fn parameters(&self) -> Fields<'_> {
        self.fields(FieldKind::Parameter)
    }

    /// Result operations.
    #[must_use]
    pub fn results(&self) -> Fields<'_> {
        self.fields(FieldKind::Result)
    }

    /// Parameter or result operations, by kind.
    #[must_use]
    pub fn fields(&self, kind: FieldKind) -> Fields<'_> {
        Fields::new(self, kind)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &InstanceDbConfig {
        &self.config
    }

    /// Returns the key space of this handle's scope.
    #[must_use]
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// Returns the type resolver.
    #[must_use]
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Returns the driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn BackendDriver> {
        &self.driver
    }

    /// Checks that the driver's engine is reachable.
    ///
    /// # Errors
    ///
    /// Returns the driver's failure.
    pub async fn health_check(&self) -> DbResult<()> {
        self.driver.health_check().await
    }

    /// The base64 preference of one call.
    pub(crate) fn prefer_base64(&self, args: &Args) -> bool {
        args.prefer_base64.unwrap_or(self.config.prefer_base64())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_validates_config() {
        let config: InstanceDbConfig = serde_json::from_str(r#"{ "scope": "a:b" }"#).unwrap();
        let err = InstanceDb::builder()
            .config(config)
            .driver(Arc::new(DocumentDriver::new(MemoryCollection::new())))
            .build()
            .unwrap_err();
        assert!(matches!(err, DbError::Config { .. }));
    }

    #[test]
    fn test_in_memory_uses_scope() {
        let db = InstanceDb::in_memory(InstanceDbConfig::builder().scope("jobs").build().unwrap())
            .unwrap();
        assert_eq!(db.keys().scope(), "jobs");
        assert!(db.resolver().schema().is_none());
    }

    #[test]
    fn test_in_memory_rejects_pool_backend() {
        let config = InstanceDbConfig::builder().force_pool(true).build().unwrap();
        assert!(matches!(InstanceDb::in_memory(config), Err(DbError::Config { .. })));
    }

    #[test]
    fn test_call_preference_overrides_default() {
        let config = InstanceDbConfig::builder().prefer_base64(true).build().unwrap();
        let db = InstanceDb::in_memory(config).unwrap();
        assert!(db.prefer_base64(&Args::new()));
        assert!(!db.prefer_base64(&Args::new().prefer_base64(false)));
    }
}
