//! Instance operations.
//!
//! An instance is stored as one JSON-object record plus independent
//! parameter and result entries. The composite operations here keep the
//! two views consistent:
//!
//! | Operation | Steps |
//! |-----------|-------|
//! | [`set`](Instances::set) | record, then each parameter, then each result |
//! | [`get`](Instances::get) | record, stored names, optional embedded values |
//! | [`get_all`](Instances::get_all) | every record of the owner, optional status filter |
//! | [`remove`](Instances::remove) | parameters, then results, then the record |
//!
//! Steps run strictly in order. The first failure aborts the remaining steps
//! and is returned; completed steps are not rolled back.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use crate::{
    args::{Args, instance_request, owner_request},
    db::InstanceDb,
    error::{DbError, DbResult},
    keys::Target,
    schema::TypeSelection,
    types::{FieldKind, Value, ValueType},
};

/// The top-level fields of a stored instance record.
pub type InstanceRecord = Map<String, JsonValue>;

const ID: &str = "id";
const PARAMETERS: &str = "parameters";
const RESULTS: &str = "results";
const PARAMETERS_STORED: &str = "parameters_stored";
const RESULTS_STORED: &str = "results_stored";

/// An instance as read back by [`Instances::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredInstance {
    /// The key-derived instance id.
    pub id: String,
    /// The stored record. Never contains `id`, `parameters` or `results`.
    pub fields: InstanceRecord,
    /// Names of the stored parameters, sorted.
    pub parameters_stored: Vec<String>,
    /// Names of the stored results, sorted.
    pub results_stored: Vec<String>,
    /// Embedded parameter values, when requested.
    pub parameters: Option<BTreeMap<String, Value>>,
    /// Embedded result values, when requested.
    pub results: Option<BTreeMap<String, Value>>,
}

impl StoredInstance {
    /// Returns the stored `status` field.
    #[must_use]
    pub fn status(&self) -> Option<&JsonValue> {
        self.fields.get("status")
    }

    /// Renders the instance as one JSON document with `id` re-attached.
    ///
    /// ```
    /// use instancedb::StoredInstance;
    /// use serde_json::json;
    ///
    /// let instance = StoredInstance { id: "2".into(), ..Default::default() };
    /// assert_eq!(
    ///     serde_json::Value::Object(instance.into_document()),
    ///     json!({ "id": "2", "parameters_stored": [], "results_stored": [] }),
    /// );
    /// ```
    #[must_use]
    pub fn into_document(self) -> Map<String, JsonValue> {
        let mut document = self.fields;
        document.insert(ID.to_owned(), JsonValue::String(self.id));
        document.insert(PARAMETERS_STORED.to_owned(), names_json(self.parameters_stored));
        document.insert(RESULTS_STORED.to_owned(), names_json(self.results_stored));
        if let Some(parameters) = self.parameters {
            document.insert(PARAMETERS.to_owned(), values_json(parameters));
        }
        if let Some(results) = self.results {
            document.insert(RESULTS.to_owned(), values_json(results));
        }
        document
    }
}

fn names_json(names: Vec<String>) -> JsonValue {
    JsonValue::Array(names.into_iter().map(JsonValue::String).collect())
}

fn values_json(values: BTreeMap<String, Value>) -> JsonValue {
    JsonValue::Object(values.into_iter().map(|(name, value)| (name, value.to_json())).collect())
}

/// Operations on instances.
///
/// Obtained from [`InstanceDb::instances`].
#[derive(Debug, Clone, Copy)]
pub struct Instances<'a> {
    db: &'a InstanceDb,
}

impl<'a> Instances<'a> {
    pub(crate) fn new(db: &'a InstanceDb) -> Self {
        Self { db }
    }

    /// Stores `args.instance`.
    ///
    /// `parameters` and `results` are unpacked from the payload and stored
    /// as separate entries; empty values among them are skipped. `id` is
    /// dropped from the record since the key carries it.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] for an incomplete address or a missing
    /// instance payload. Otherwise the first driver failure.
    #[tracing::instrument(skip(self, args))]
    pub async fn set(&self, args: &Args) -> DbResult<()> {
        let request = instance_request(Some(args))?;
        let mut record = args
            .instance
            .clone()
            .ok_or_else(|| DbError::invalid_argument("instance must be specified"))?;

        let parameters = take_values(&mut record, PARAMETERS);
        let results = take_values(&mut record, RESULTS);
        record.remove(ID);

        let key = self.db.keys().instance_key(&request.owner, Target::Named(&request.id));
        self.db.driver().set(&key, &Value::Object(record), ValueType::JsonObject).await?;

        for (kind, values) in [(FieldKind::Parameter, parameters), (FieldKind::Result, results)] {
            let fields = self.db.fields(kind);
            for (name, value) in values {
                let value = Value::from(value);
                if value.is_empty() {
                    tracing::debug!(%kind, name = %name, "skipping empty value");
                    continue;
                }
                fields.store(&request, &name, &value).await?;
            }
        }

        Ok(())
    }

    /// Reads one instance. `None` when no record is stored.
    ///
    /// The answer always lists the stored parameter and result names.
    /// `args.embed_parameters` / `args.embed_results` additionally embed the
    /// decoded values, all of them or only the named ones.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] for an incomplete address, or the first
    /// driver failure.
    #[tracing::instrument(skip(self, args))]
    pub async fn get(&self, args: &Args) -> DbResult<Option<StoredInstance>> {
        let request = instance_request(Some(args))?;
        let key = self.db.keys().instance_key(&request.owner, Target::Named(&request.id));

        let Some(record) = self.db.driver().get(&key, ValueType::JsonObject).await? else {
            return Ok(None);
        };

        let prefer_base64 = self.db.prefer_base64(args);
        let parameters = self.db.parameters();
        let results = self.db.results();

        let parameters_stored = parameters.names_of(&request).await?;
        let results_stored = results.names_of(&request).await?;

        let embedded_parameters = match &args.embed_parameters {
            Some(embed) => Some(parameters.embedded(&request, embed, prefer_base64).await?),
            None => None,
        };
        let embedded_results = match &args.embed_results {
            Some(embed) => Some(results.embedded(&request, embed, prefer_base64).await?),
            None => None,
        };

        Ok(Some(StoredInstance {
            fields: into_record(&key, record),
            id: request.id,
            parameters_stored,
            results_stored,
            parameters: embedded_parameters,
            results: embedded_results,
        }))
    }

    /// Reads every instance record of the owner, keyed by instance id.
    ///
    /// With `args.status`, records whose `status` differs are dropped after
    /// the fetch. `args.id` is ignored.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] when no owner is named, or the driver's
    /// failure.
    #[tracing::instrument(skip(self, args))]
    pub async fn get_all(&self, args: &Args) -> DbResult<BTreeMap<String, InstanceRecord>> {
        let owner = owner_request(Some(args))?;
        let prefix = self.db.keys().instance_prefix(&owner);
        let status = args.status.as_ref().filter(|status| is_given(status));

        let records = self
            .db
            .driver()
            .get_all(&prefix, &TypeSelection::Single(ValueType::JsonObject))
            .await?;

        let mut instances = BTreeMap::new();
        for (id, record) in records {
            let record = into_record(&id, record);
            if let Some(status) = status {
                if record.get("status") != Some(status) {
                    tracing::debug!(id = %id, "instance filtered out by status");
                    continue;
                }
            }
            instances.insert(id, record);
        }

        Ok(instances)
    }

    /// Removes an instance with all its parameters and results.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] for an incomplete address, or the first
    /// driver failure. Entries removed before the failure stay removed.
    #[tracing::instrument(skip(self, args))]
    pub async fn remove(&self, args: &Args) -> DbResult<()> {
        let request = instance_request(Some(args))?;

        self.db.parameters().remove_all_of(&request).await?;
        self.db.results().remove_all_of(&request).await?;

        let key = self.db.keys().instance_key(&request.owner, Target::Named(&request.id));
        self.db.driver().remove(&key).await
    }
}

fn take_values(record: &mut InstanceRecord, field: &str) -> Map<String, JsonValue> {
    match record.remove(field) {
        Some(JsonValue::Object(values)) => values,
        Some(JsonValue::Null) | None => Map::new(),
        Some(other) => {
            tracing::warn!(field, kind = json_kind(&other), "ignoring non-object value map");
            Map::new()
        },
    }
}

fn into_record(key: &str, value: Value) -> InstanceRecord {
    match value {
        Value::Object(record) => record,
        _ => {
            tracing::warn!(key, "instance record is not an object; treating it as empty");
            InstanceRecord::new()
        },
    }
}

fn is_given(status: &JsonValue) -> bool {
    !matches!(status, JsonValue::Null) && status.as_str() != Some("")
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
