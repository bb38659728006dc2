//! Parameter and result operations.
//!
//! Parameters and results share one façade, [`Fields`], parameterized by
//! [`FieldKind`]. Every operation validates its [`Args`], resolves the
//! field type, builds the key and delegates to the driver.

use std::collections::BTreeMap;

use crate::{
    args::{Args, Embed, InstanceRequest, field_request, instance_request},
    db::InstanceDb,
    error::{DbError, DbResult},
    keys::Target,
    types::{FieldKind, Value},
};

/// Operations on the parameters (or results) of instances.
///
/// Obtained from [`InstanceDb::parameters`] or [`InstanceDb::results`].
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    db: &'a InstanceDb,
    kind: FieldKind,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(db: &'a InstanceDb, kind: FieldKind) -> Self {
        Self { db, kind }
    }

    /// Whether this façade handles parameters or results.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Stores `args.value` under the named field.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] when the instance address or the name is
    /// incomplete, or when the value is absent or
    /// [empty](crate::Value::is_empty). Otherwise the driver's failure.
    #[tracing::instrument(skip(self, args), fields(kind = %self.kind))]
    pub async fn set(&self, args: &Args) -> DbResult<()> {
        let request = field_request(Some(args), self.kind)?;
        let value = args
            .value
            .as_ref()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| DbError::invalid_argument("value must be specified"))?;

        self.store(&request.instance, &request.name, value).await
    }

    /// Reads the named field. `None` when it is not stored.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] for an incomplete address, or the
    /// driver's failure.
    #[tracing::instrument(skip(self, args), fields(kind = %self.kind))]
    pub async fn get(&self, args: &Args) -> DbResult<Option<Value>> {
        let request = field_request(Some(args), self.kind)?;
        let instance = &request.instance;
        let name = Target::Named(&request.name);

        let key = self.db.keys().field_key(self.kind, &instance.owner, &instance.id, name);
        let value_type = self
            .db
            .resolver()
            .resolve(self.kind, &instance.owner, name, self.db.prefer_base64(args))
            .for_name(&request.name);

        self.db.driver().get(&key, value_type).await
    }

    /// Reads every stored field of one instance, each decoded with its own
    /// declared type.
    ///
    /// With `args.filter` (or, failing that, an explicit name list in the
    /// matching embed selection) only those names are kept. Names that are
    /// not stored are left out rather than reported as absent.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] for an incomplete instance address, or
    /// the driver's failure.
    #[tracing::instrument(skip(self, args), fields(kind = %self.kind))]
    pub async fn get_all(&self, args: &Args) -> DbResult<BTreeMap<String, Value>> {
        let request = instance_request(Some(args))?;
        let mut values = self.fetch_all(&request, self.db.prefer_base64(args)).await?;

        if let Some(names) = self.selection(args) {
            retain_names(&mut values, names);
        }

        Ok(values)
    }

    /// Names of every stored field of one instance, sorted.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] for an incomplete instance address, or
    /// the driver's failure.
    #[tracing::instrument(skip(self, args), fields(kind = %self.kind))]
    pub async fn list(&self, args: &Args) -> DbResult<Vec<String>> {
        let request = instance_request(Some(args))?;
        self.names_of(&request).await
    }

    /// Removes the named field. Removing a missing field is a no-op.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] for an incomplete address, or the
    /// driver's failure.
    #[tracing::instrument(skip(self, args), fields(kind = %self.kind))]
    pub async fn remove(&self, args: &Args) -> DbResult<()> {
        let request = field_request(Some(args), self.kind)?;
        let instance = &request.instance;
        let key = self.db.keys().field_key(
            self.kind,
            &instance.owner,
            &instance.id,
            Target::Named(&request.name),
        );

        self.db.driver().remove(&key).await
    }

    fn selection<'b>(&self, args: &'b Args) -> Option<&'b [String]> {
        if let Some(filter) = &args.filter {
            return Some(filter.as_slice());
        }
        let embed = match self.kind {
            FieldKind::Parameter => args.embed_parameters.as_ref(),
            FieldKind::Result => args.embed_results.as_ref(),
        };
        match embed {
            Some(Embed::Names(names)) => Some(names.as_slice()),
            _ => None,
        }
    }

    pub(crate) async fn store(
        &self,
        instance: &InstanceRequest,
        name: &str,
        value: &Value,
    ) -> DbResult<()> {
        let target = Target::Named(name);
        let key = self.db.keys().field_key(self.kind, &instance.owner, &instance.id, target);
        let value_type =
            self.db.resolver().resolve(self.kind, &instance.owner, target, false).for_name(name);

        self.db.driver().set(&key, value, value_type).await
    }

    pub(crate) async fn fetch_all(
        &self,
        instance: &InstanceRequest,
        prefer_base64: bool,
    ) -> DbResult<BTreeMap<String, Value>> {
        let prefix = self.db.keys().field_prefix(self.kind, &instance.owner, &instance.id);
        let types =
            self.db.resolver().resolve(self.kind, &instance.owner, Target::All, prefer_base64);

        self.db.driver().get_all(&prefix, &types).await
    }

    pub(crate) async fn embedded(
        &self,
        instance: &InstanceRequest,
        embed: &Embed,
        prefer_base64: bool,
    ) -> DbResult<BTreeMap<String, Value>> {
        let mut values = self.fetch_all(instance, prefer_base64).await?;
        if let Embed::Names(names) = embed {
            retain_names(&mut values, names);
        }
        Ok(values)
    }

    pub(crate) async fn names_of(&self, instance: &InstanceRequest) -> DbResult<Vec<String>> {
        let prefix = self.db.keys().field_prefix(self.kind, &instance.owner, &instance.id);
        let mut names = self.db.driver().list(&prefix).await?;
        names.sort_unstable();
        Ok(names)
    }

    pub(crate) async fn remove_all_of(&self, instance: &InstanceRequest) -> DbResult<()> {
        let prefix = self.db.keys().field_prefix(self.kind, &instance.owner, &instance.id);
        self.db.driver().remove_all(&prefix).await
    }
}

fn retain_names(values: &mut BTreeMap<String, Value>, names: &[String]) {
    values.retain(|name, _| names.iter().any(|wanted| wanted == name));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::{ApiSchema, DocumentDriver, InstanceDbConfig, MemoryCollection};

    fn db_with_schema() -> InstanceDb {
        let schema: ApiSchema = serde_json::from_value(json!({
            "executables": {
                "convert": {
                    "parameters_schema": {
                        "image": { "type": "byte_string" },
                        "options": { "type": "json_object" },
                        "retries": { "type": "number" }
                    },
                    "results_schema": { "done": { "type": "boolean" } }
                }
            }
        }))
        .unwrap();

        InstanceDb::builder()
            .config(InstanceDbConfig::default())
            .driver(Arc::new(DocumentDriver::new(MemoryCollection::new())))
            .schema(schema)
            .build()
            .unwrap()
    }

    fn addr() -> Args {
        Args::new().id("1").executable("convert")
    }

    #[tokio::test]
    async fn test_set_requires_a_value() {
        let db = db_with_schema();

        let err = db.parameters().set(&addr().name("x")).await.unwrap_err();
        assert!(err.to_string().contains("value must be specified"));

        let err = db.parameters().set(&addr().name("x").value("")).await.unwrap_err();
        assert!(err.is_invalid_argument());

        for falsy in [Value::from(false), Value::from(0)] {
            let err = db.results().set(&addr().name("done").value(falsy)).await.unwrap_err();
            assert!(err.is_invalid_argument());
        }
        assert!(db.results().list(&addr()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_typed_fields_round_trip() {
        let db = db_with_schema();
        let params = db.parameters();

        params.set(&addr().name("image").value(vec![0u8, 1, 2])).await.unwrap();
        params.set(&addr().name("options").value(json!({ "a": [1] }))).await.unwrap();
        params.set(&addr().name("retries").value(3)).await.unwrap();

        assert_eq!(
            params.get(&addr().name("image")).await.unwrap(),
            Some(Value::Bytes(Bytes::from_static(&[0, 1, 2])))
        );
        assert_eq!(
            params.get(&addr().name("image").prefer_base64(true)).await.unwrap(),
            Some(Value::from("AAEC"))
        );
        assert_eq!(params.list(&addr()).await.unwrap(), vec!["image", "options", "retries"]);

        let all = params.get_all(&addr()).await.unwrap();
        assert_eq!(all["options"], Value::from(json!({ "a": [1] })));
        assert_eq!(all["retries"], Value::from(3));
        assert!(all["image"].as_bytes().is_some());
    }

    #[tokio::test]
    async fn test_get_all_filter_drops_unknown_names() {
        let db = db_with_schema();
        db.results().set(&addr().name("done").value(true)).await.unwrap();
        db.results().set(&addr().name("log").value("ok")).await.unwrap();

        let filtered = db.results().get_all(&addr().filter(["done", "missing"])).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered["done"], Value::from(true));
    }

    #[tokio::test]
    async fn test_embed_names_act_as_filter() {
        let db = db_with_schema();
        db.parameters().set(&addr().name("a").value("1")).await.unwrap();
        db.parameters().set(&addr().name("b").value("2")).await.unwrap();

        let args = addr().embed_parameters(Embed::names(["a"]));
        let values = db.parameters().get_all(&args).await.unwrap();
        let values: Vec<_> = values.into_iter().collect();
        assert_eq!(values, vec![("a".to_owned(), Value::from("1"))]);

        let values = db.parameters().get_all(&addr().embed_parameters(Embed::All)).await.unwrap();
        assert_eq!(values.len(), 2);
    }

    #[tokio::test]
    async fn test_kinds_do_not_overlap() {
        let db = db_with_schema();
        db.parameters().set(&addr().name("x").value("p")).await.unwrap();
        db.results().set(&addr().name("x").value("r")).await.unwrap();

        db.results().remove(&addr().name("x")).await.unwrap();
        assert_eq!(db.parameters().get(&addr().name("x")).await.unwrap(), Some(Value::from("p")));
        assert_eq!(db.results().get(&addr().name("x")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_written_type_follows_schema() {
        let db = db_with_schema();
        db.parameters().set(&addr().name("retries").value("7")).await.unwrap();

        // Declared as a number, so a JSON text payload parses on read.
        let value = db.parameters().get(&addr().name("retries")).await.unwrap();
        assert_eq!(value, Some(Value::from(7)));
        assert_eq!(db.driver().decode_failures(), 0);
    }
}
