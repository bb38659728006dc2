//! Embedded document-store driver.
//!
//! [`DocumentDriver`] implements [`BackendDriver`] on top of any
//! [`DocumentCollection`]: an embedded collection of JSON documents keyed by
//! their `_id` field. The collection engine itself is external; the crate
//! ships [`MemoryCollection`](crate::MemoryCollection) for testing and
//! development.
//!
//! # Document Layout
//!
//! | Declared type | Stored value | Document |
//! |---------------|--------------|----------|
//! | JSON type | object | `{ "_id": key, ..fields }` |
//! | JSON type | anything else | `{ "_id": key, "_wrapped": value }` |
//! | other types | any | `{ "_id": key, "_text": "<text form>" }` |
//!
//! The single-field envelopes let scalars, arrays and objects share one
//! collection without schema conflicts. Objects that carry `_id`, or that
//! consist of one envelope field, are stored under `_wrapped` as well. Values
//! declared with a non-JSON type are kept in their
//! [text form](crate::codec::encode_text), so they read back the way the
//! raw-string driver returns them.
//!
//! # Upserts
//!
//! Collections have no native upsert, so `set` is a find followed by an
//! insert or an update. The driver serializes that read-modify-write under
//! an async mutex; two concurrent writers to the same key can therefore
//! never both take the insert path. An update that finds the document gone
//! falls back to an insert.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use tokio::sync::Mutex;

use crate::{
    codec::{DecodeMonitor, Decoded, decode_text, encode_text},
    driver::BackendDriver,
    error::DbResult,
    keys::leaf_name,
    memory::MemoryCollection,
    schema::TypeSelection,
    types::{Value, ValueType},
};

/// A stored document.
pub type Document = Map<String, JsonValue>;

/// Field holding a document's key.
pub const ID_FIELD: &str = "_id";

/// Field of the single-field envelope around non-object JSON values.
pub const ENVELOPE_FIELD: &str = "_wrapped";

/// Field of the single-field envelope around text forms.
pub const TEXT_FIELD: &str = "_text";

/// An embedded collection of JSON documents keyed by [`ID_FIELD`].
///
/// This is the engine seam of the document driver. Implementations only
/// need exact-id and id-prefix queries.
#[async_trait]
pub trait DocumentCollection: Send + Sync + std::fmt::Debug {
    /// Finds the document whose id is `id`.
    async fn find_one(&self, id: &str) -> DbResult<Option<Document>>;

    /// Finds every document whose id starts with `prefix`.
    async fn find_prefix(&self, prefix: &str) -> DbResult<Vec<Document>>;

    /// Inserts a new document. Fails if its id already exists.
    async fn insert(&self, document: Document) -> DbResult<()>;

    /// Replaces the document whose id is `id`. Returns the number of
    /// documents replaced.
    async fn update(&self, id: &str, document: Document) -> DbResult<u64>;

    /// Removes the document whose id is `id`. Returns the number removed.
    async fn remove(&self, id: &str) -> DbResult<u64>;

    /// Removes every document whose id starts with `prefix`. Returns the
    /// number removed.
    async fn remove_prefix(&self, prefix: &str) -> DbResult<u64>;

    /// Verifies the collection is usable.
    async fn health_check(&self) -> DbResult<()>;
}

/// Wraps a value declared as `value_type` into a document body (without
/// its id).
#[must_use]
pub fn wrap(value: &Value, value_type: ValueType) -> Document {
    if !value_type.is_json() {
        return envelope(TEXT_FIELD, JsonValue::String(encode_text(value)));
    }

    match value.to_json() {
        JsonValue::Object(map) if !is_reserved(&map) => map,
        other => envelope(ENVELOPE_FIELD, other),
    }
}

fn is_reserved(map: &Document) -> bool {
    map.contains_key(ID_FIELD)
        || (map.len() == 1 && (map.contains_key(ENVELOPE_FIELD) || map.contains_key(TEXT_FIELD)))
}

fn envelope(field: &str, inner: JsonValue) -> Document {
    let mut document = Map::with_capacity(1);
    document.insert(field.to_owned(), inner);
    document
}

/// Unwraps a stored document into a value of `value_type`.
///
/// Never fails: a payload that does not decode as its type comes back raw,
/// flagged as degraded.
#[must_use]
pub fn unwrap(mut document: Document, value_type: ValueType) -> Decoded {
    document.remove(ID_FIELD);

    if let (1, Some(JsonValue::String(text))) = (document.len(), document.get(TEXT_FIELD)) {
        return decode_text(text.clone(), value_type);
    }

    let inner = if document.len() == 1 && document.contains_key(ENVELOPE_FIELD) {
        document.remove(ENVELOPE_FIELD).unwrap_or_default()
    } else {
        JsonValue::Object(document)
    };

    if value_type.is_json() {
        Decoded::clean(Value::from(inner))
    } else {
        decode_text(inner.to_string(), value_type)
    }
}

/// [`BackendDriver`] over an embedded [`DocumentCollection`].
///
/// # Example
///
/// ```
/// use instancedb::{BackendDriver, DocumentDriver, MemoryCollection, Value, ValueType};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let driver = DocumentDriver::new(MemoryCollection::new());
///
/// driver.set("default:parameter:invoker:inv:1:n", &Value::from(3), ValueType::Number).await?;
/// let value = driver.get("default:parameter:invoker:inv:1:n", ValueType::Number).await?;
/// assert_eq!(value, Some(Value::from(3)));
/// # Ok::<(), instancedb::DbError>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct DocumentDriver<C = MemoryCollection> {
    collection: C,
    write_lock: Mutex<()>,
    monitor: DecodeMonitor,
}

impl<C: DocumentCollection> DocumentDriver<C> {
    /// Creates a driver over `collection`.
    pub fn new(collection: C) -> Self {
        Self { collection, write_lock: Mutex::new(()), monitor: DecodeMonitor::new() }
    }

    /// Returns the underlying collection.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    fn decode(&self, key: &str, document: Document, value_type: ValueType) -> Value {
        self.monitor.settle(key, value_type, unwrap(document, value_type))
    }
}

fn document_id(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(JsonValue::as_str)
}

#[async_trait]
impl<C: DocumentCollection> BackendDriver for DocumentDriver<C> {
    #[tracing::instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &Value, value_type: ValueType) -> DbResult<()> {
        let mut document = wrap(value, value_type);
        document.insert(ID_FIELD.to_owned(), JsonValue::String(key.to_owned()));

        let _guard = self.write_lock.lock().await;
        if self.collection.find_one(key).await?.is_some() {
            let replaced = self.collection.update(key, document.clone()).await?;
            if replaced > 0 {
                return Ok(());
            }
            tracing::debug!("document vanished before its update; inserting");
        }
        self.collection.insert(document).await
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str, value_type: ValueType) -> DbResult<Option<Value>> {
        let document = self.collection.find_one(key).await?;
        Ok(document.map(|document| self.decode(key, document, value_type)))
    }

    #[tracing::instrument(skip(self))]
    async fn remove(&self, key: &str) -> DbResult<()> {
        self.collection.remove(key).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove_all(&self, prefix: &str) -> DbResult<()> {
        let removed = self.collection.remove_prefix(prefix).await?;
        tracing::debug!(removed, "removed documents by prefix");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> DbResult<Vec<String>> {
        let documents = self.collection.find_prefix(prefix).await?;
        Ok(documents.iter().filter_map(document_id).map(|id| leaf_name(id).to_owned()).collect())
    }

    #[tracing::instrument(skip(self, types))]
    async fn get_all(
        &self,
        prefix: &str,
        types: &TypeSelection,
    ) -> DbResult<BTreeMap<String, Value>> {
        let documents = self.collection.find_prefix(prefix).await?;

        let mut values = BTreeMap::new();
        for document in documents {
            let Some(id) = document_id(&document).map(str::to_owned) else {
                tracing::warn!("skipping document without an id");
                continue;
            };
            let leaf = leaf_name(&id).to_owned();
            let value = self.decode(&id, document, types.for_name(&leaf));
            values.insert(leaf, value);
        }

        Ok(values)
    }

    async fn health_check(&self) -> DbResult<()> {
        self.collection.health_check().await
    }

    fn decode_failures(&self) -> u64 {
        self.monitor.failures()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn stored(value: &Value, value_type: ValueType) -> Document {
        let mut document = wrap(value, value_type);
        document.insert(ID_FIELD.to_owned(), json!("scope:parameter:invoker:i:1:x"));
        document
    }

    #[test]
    fn test_objects_are_stored_as_the_document_body() {
        let object = Value::from(json!({ "created": "1970-01-01" }));
        let document = wrap(&object, ValueType::JsonObject);
        assert_eq!(JsonValue::Object(document), json!({ "created": "1970-01-01" }));
    }

    #[rstest]
    #[case::number(Value::from(7), ValueType::Number, json!({ "_wrapped": 7 }))]
    #[case::array(Value::from(json!([1, 2])), ValueType::JsonArray, json!({ "_wrapped": [1, 2] }))]
    #[case::text_under_number(Value::from("7"), ValueType::Number, json!({ "_wrapped": "7" }))]
    #[case::bytes(Value::from(vec![1, 2, 3]), ValueType::ByteString, json!({ "_text": "AQID" }))]
    #[case::text(Value::from("hi"), ValueType::TextString, json!({ "_text": "hi" }))]
    #[case::number_as_text(Value::from(3), ValueType::TextString, json!({ "_text": "3" }))]
    #[case::object_as_text(
        Value::from(json!({ "a": 1 })),
        ValueType::XmlObject,
        json!({ "_text": r#"{"a":1}"# })
    )]
    fn test_values_are_enveloped_by_declared_type(
        #[case] value: Value,
        #[case] value_type: ValueType,
        #[case] expected: JsonValue,
    ) {
        assert_eq!(JsonValue::Object(wrap(&value, value_type)), expected);
    }

    #[rstest]
    #[case::id(json!({ "_id": "x", "a": 1 }))]
    #[case::envelope(json!({ "_wrapped": 1 }))]
    #[case::text_envelope(json!({ "_text": "t" }))]
    fn test_reserved_objects_survive_in_the_envelope(#[case] object: JsonValue) {
        let value = Value::from(object.clone());
        let document = stored(&value, ValueType::JsonObject);
        assert_eq!(document[ENVELOPE_FIELD], object);
        assert_eq!(unwrap(document, ValueType::JsonObject), Decoded::clean(value));
    }

    #[test]
    fn test_base64_preference_returns_text() {
        let document = stored(&Value::from(b"png".to_vec()), ValueType::ByteString);
        assert_eq!(unwrap(document, ValueType::Base64Text), Decoded::clean(Value::from("cG5n")));
    }

    #[test]
    fn test_malformed_binary_degrades_to_raw_text() {
        let document = stored(&Value::from("%%%"), ValueType::ByteString);
        let decoded = unwrap(document, ValueType::ByteString);
        assert_eq!(decoded.value, Value::from("%%%"));
        assert!(decoded.degraded.is_some());
    }

    #[test]
    fn test_text_under_json_types_stays_text() {
        let decoded = unwrap(stored(&Value::from("7"), ValueType::Number), ValueType::Number);
        assert_eq!(decoded, Decoded::clean(Value::from("7")));

        let object = Value::from("{\"a\":1}");
        let decoded = unwrap(stored(&object, ValueType::JsonObject), ValueType::JsonObject);
        assert_eq!(decoded, Decoded::clean(object));
    }

    #[test]
    fn test_text_read_under_a_json_type_is_parsed() {
        let decoded = unwrap(stored(&Value::from("42"), ValueType::TextString), ValueType::Number);
        assert_eq!(decoded, Decoded::clean(Value::from(42)));

        let document = stored(&Value::from("seven"), ValueType::TextString);
        let decoded = unwrap(document, ValueType::Number);
        assert_eq!(decoded.value, Value::from("seven"));
        assert!(decoded.degraded.is_some());
    }

    #[tokio::test]
    async fn test_set_inserts_when_the_document_vanishes_before_its_update() {
        /// Removes the document it finds, as a concurrent `remove` would.
        #[derive(Debug, Default)]
        struct RacingCollection(MemoryCollection);

        #[async_trait]
        impl DocumentCollection for RacingCollection {
            async fn find_one(&self, id: &str) -> DbResult<Option<Document>> {
                let found = self.0.find_one(id).await?;
                self.0.remove(id).await?;
                Ok(found)
            }

            async fn find_prefix(&self, prefix: &str) -> DbResult<Vec<Document>> {
                self.0.find_prefix(prefix).await
            }

            async fn insert(&self, document: Document) -> DbResult<()> {
                self.0.insert(document).await
            }

            async fn update(&self, id: &str, document: Document) -> DbResult<u64> {
                self.0.update(id, document).await
            }

            async fn remove(&self, id: &str) -> DbResult<u64> {
                self.0.remove(id).await
            }

            async fn remove_prefix(&self, prefix: &str) -> DbResult<u64> {
                self.0.remove_prefix(prefix).await
            }

            async fn health_check(&self) -> DbResult<()> {
                Ok(())
            }
        }

        let driver = DocumentDriver::new(RacingCollection::default());
        driver.set("s:k", &Value::from("old"), ValueType::TextString).await.unwrap();
        driver.set("s:k", &Value::from("new"), ValueType::TextString).await.unwrap();

        let stored = driver.collection().0.find_one("s:k").await.unwrap().unwrap();
        assert_eq!(unwrap(stored, ValueType::TextString), Decoded::clean(Value::from("new")));
    }

    fn typed_values() -> impl Strategy<Value = (Value, ValueType)> {
        prop_oneof![
            ".*".prop_map(|s| (Value::Text(s), ValueType::TextString)),
            ".*".prop_map(|s| (Value::Text(s), ValueType::XmlObject)),
            proptest::collection::vec(any::<u8>(), 0..64)
                .prop_map(|b| (Value::Bytes(Bytes::from(b)), ValueType::ByteString)),
            any::<i64>().prop_map(|n| (Value::from(n), ValueType::Number)),
            any::<bool>().prop_map(|b| (Value::Bool(b), ValueType::Boolean)),
            ("[a-z]{1,8}", ".*").prop_map(|(k, v)| {
                (Value::from(json!({ k: { "nested": [v] } })), ValueType::JsonObject)
            }),
            proptest::collection::vec(any::<i32>(), 0..8)
                .prop_map(|v| (Value::from(json!(v)), ValueType::JsonArray)),
        ]
    }

    proptest! {
        /// Every declared type decodes back to the value that was wrapped.
        #[test]
        fn test_wrap_unwrap_round_trip((value, value_type) in typed_values()) {
            let decoded = unwrap(stored(&value, value_type), value_type);
            prop_assert_eq!(decoded, Decoded::clean(value));
        }
    }
}
