//! Conformance test suite for [`BackendDriver`] implementations.
//!
//! Every driver, whatever its native value model, must expose the same
//! contract to the façades. This module provides async test functions that
//! check it; each driver crate runs them against its own engine.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each conformance function with
//! a fresh driver:
//!
//! ```no_run
//! use instancedb::{DocumentDriver, MemoryCollection, conformance};
//!
//! #[tokio::test]
//! async fn crud_get_returns_none_for_missing_key() {
//!     let driver = DocumentDriver::new(MemoryCollection::new());
//!     conformance::crud_get_returns_none_for_missing_key(&driver).await;
//! }
//! ```
//!
//! # Test Categories
//!
//! | Category | Functions | Contract aspect |
//! |----------|-----------|-----------------|
//! | CRUD | 5 tests | Basic set/get/remove semantics |
//! | Codec | 8 tests | Typed round trips, declared-type rendering and permissive reads |
//! | Prefix | 6 tests | `list` / `get_all` / `remove_all` scoping |
//! | Concurrent | 2 tests | Per-key atomicity under parallel access |
//! | Health | 1 test | `health_check` on a fresh driver |

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use serde_json::json;

use crate::{
    driver::BackendDriver,
    schema::TypeSelection,
    types::{Value, ValueType},
};

// ============================================================================
// CRUD: Basic set/get/remove semantics (5 tests)
// ============================================================================

/// `get` on a nonexistent key returns `Ok(None)`.
pub async fn crud_get_returns_none_for_missing_key<D: BackendDriver>(driver: &D) {
    let result = driver.get("conf:missing", ValueType::TextString).await;
    assert!(result.is_ok(), "get should not error on missing key: {result:?}");
    assert_eq!(result.expect("checked above"), None, "missing key should return None");
}

/// `set` then `get` round-trips a text value.
pub async fn crud_set_then_get_returns_value<D: BackendDriver>(driver: &D) {
    driver.set("conf:k1", &Value::from("v1"), ValueType::TextString).await.expect("set");
    let value = driver.get("conf:k1", ValueType::TextString).await.expect("get");
    assert_eq!(value, Some(Value::from("v1")));
}

/// `set` on an existing key overwrites the value.
pub async fn crud_set_overwrites_existing<D: BackendDriver>(driver: &D) {
    driver.set("conf:k2", &Value::from("original"), ValueType::TextString).await.expect("set");
    driver.set("conf:k2", &Value::from("updated"), ValueType::TextString).await.expect("overwrite");
    let value = driver.get("conf:k2", ValueType::TextString).await.expect("get");
    assert_eq!(value, Some(Value::from("updated")));
}

/// `remove` on a nonexistent key is a silent no-op.
pub async fn crud_remove_nonexistent_is_noop<D: BackendDriver>(driver: &D) {
    let result = driver.remove("conf:ghost").await;
    assert!(result.is_ok(), "remove of nonexistent key should not error: {result:?}");
}

/// `remove` deletes a previously-set key, and a second `remove` is a no-op.
pub async fn crud_remove_is_idempotent<D: BackendDriver>(driver: &D) {
    driver.set("conf:k3", &Value::from("v"), ValueType::TextString).await.expect("set");
    driver.remove("conf:k3").await.expect("first remove");
    driver.remove("conf:k3").await.expect("second remove should be a no-op");
    let value = driver.get("conf:k3", ValueType::TextString).await.expect("get after remove");
    assert_eq!(value, None, "key should be gone after remove");
}

// ============================================================================
// Codec: Typed round trips and permissive reads (8 tests)
// ============================================================================

/// Every declared type reads back the value that was written with it.
pub async fn codec_typed_values_round_trip<D: BackendDriver>(driver: &D) {
    let cases = [
        (ValueType::TextString, Value::from("plain text")),
        (ValueType::XmlObject, Value::from("<a href=\"x\">y</a>")),
        (ValueType::Number, Value::from(42)),
        (ValueType::Number, Value::from(-1.5)),
        (ValueType::Boolean, Value::from(false)),
        (ValueType::JsonObject, Value::from(json!({ "nested": { "list": [1, "two", null] } }))),
        (ValueType::JsonArray, Value::from(json!([{ "a": 1 }, [2], "3"]))),
        (ValueType::ByteString, Value::from(vec![0u8, 159, 146, 150, 255])),
    ];

    for (index, (value_type, value)) in cases.into_iter().enumerate() {
        let key = format!("conf:codec:{index}");
        driver.set(&key, &value, value_type).await.expect("set");
        let read = driver.get(&key, value_type).await.expect("get");
        assert_eq!(read, Some(value), "{value_type} should round-trip");
    }
}

/// Text that looks like JSON stays text when declared as text.
pub async fn codec_text_is_not_parsed<D: BackendDriver>(driver: &D) {
    for (index, text) in ["42", "true", "{\"a\":1}", "[1]", "null"].into_iter().enumerate() {
        let key = format!("conf:text:{index}");
        driver.set(&key, &Value::from(text), ValueType::TextString).await.expect("set");
        let read = driver.get(&key, ValueType::TextString).await.expect("get");
        assert_eq!(read, Some(Value::from(text)), "text {text:?} must not be parsed");
    }
}

/// Values written under a text type read back as their text form, whatever
/// their own kind.
pub async fn codec_text_types_render_any_value_as_text<D: BackendDriver>(driver: &D) {
    let cases = [
        (ValueType::TextString, Value::from(3), "3"),
        (ValueType::TextString, Value::from(json!({ "a": 1 })), r#"{"a":1}"#),
        (ValueType::TextString, Value::from(json!([1, "x"])), r#"[1,"x"]"#),
        (ValueType::TextString, Value::from(vec![0u8, 1, 2]), "AAEC"),
        (ValueType::XmlObject, Value::from(true), "true"),
        (ValueType::Base64Text, Value::from(-2.5), "-2.5"),
    ];

    for (index, (value_type, value, text)) in cases.into_iter().enumerate() {
        let key = format!("conf:as-text:{index}");
        driver.set(&key, &value, value_type).await.expect("set");
        let read = driver.get(&key, value_type).await.expect("get");
        assert_eq!(read, Some(Value::from(text)), "{value:?} under {value_type}");
    }
}

/// Text written under a JSON type stays text; non-text values keep their
/// own kind.
pub async fn codec_json_types_keep_the_written_kind<D: BackendDriver>(driver: &D) {
    let cases = [
        (ValueType::Number, Value::from("7")),
        (ValueType::Boolean, Value::from("true")),
        (ValueType::JsonObject, Value::from("{\"a\":1}")),
        (ValueType::JsonArray, Value::from("plain")),
        (ValueType::JsonObject, Value::from(5)),
        (ValueType::Number, Value::from(json!({ "a": 1 }))),
        (ValueType::Boolean, Value::from(json!([true]))),
    ];

    let before = driver.decode_failures();
    for (index, (value_type, value)) in cases.into_iter().enumerate() {
        let key = format!("conf:as-json:{index}");
        driver.set(&key, &value, value_type).await.expect("set");
        let read = driver.get(&key, value_type).await.expect("get");
        assert_eq!(read, Some(value.clone()), "{value:?} under {value_type}");
    }
    assert_eq!(driver.decode_failures(), before, "none of these reads is degraded");

    let bytes = Value::from(vec![0u8, 1, 2]);
    driver.set("conf:as-json:bytes", &bytes, ValueType::Number).await.expect("set");
    let read = driver.get("conf:as-json:bytes", ValueType::Number).await.expect("get");
    assert_eq!(read, Some(Value::from("AAEC")), "bytes under a JSON type read back as base64");
}

/// Binary data read with the base64 preference comes back as base64 text.
pub async fn codec_base64_preference_returns_text<D: BackendDriver>(driver: &D) {
    let png = Value::from(b"png".to_vec());
    driver.set("conf:b64", &png, ValueType::ByteString).await.expect("set");
    let read = driver.get("conf:b64", ValueType::Base64Text).await.expect("get");
    assert_eq!(read, Some(Value::from("cG5n")));
}

/// Base64 text written to a binary field reads back as the decoded bytes.
pub async fn codec_base64_text_input_reads_as_bytes<D: BackendDriver>(driver: &D) {
    driver.set("conf:b64in", &Value::from("AAEC"), ValueType::ByteString).await.expect("set");
    let read = driver.get("conf:b64in", ValueType::ByteString).await.expect("get");
    assert_eq!(read, Some(Value::Bytes(Bytes::from_static(&[0, 1, 2]))));
}

/// A payload that does not parse as its declared JSON type is returned raw
/// and counted.
pub async fn codec_malformed_json_returns_raw<D: BackendDriver>(driver: &D) {
    let before = driver.decode_failures();
    let raw = Value::from("not json");
    driver.set("conf:bad:json", &raw, ValueType::TextString).await.expect("set");

    let read = driver.get("conf:bad:json", ValueType::JsonObject).await;
    assert!(read.is_ok(), "decode failures must not be errors: {read:?}");
    assert_eq!(read.expect("checked above"), Some(Value::from("not json")));
    assert_eq!(driver.decode_failures(), before + 1, "degraded read should be counted");
}

/// A payload that is not base64 read as binary is returned raw and counted.
pub async fn codec_malformed_base64_returns_raw<D: BackendDriver>(driver: &D) {
    let before = driver.decode_failures();
    driver.set("conf:bad:b64", &Value::from("%%%"), ValueType::TextString).await.expect("set");

    let read = driver.get("conf:bad:b64", ValueType::ByteString).await.expect("get");
    assert_eq!(read, Some(Value::from("%%%")));
    assert_eq!(driver.decode_failures(), before + 1, "degraded read should be counted");
}

// ============================================================================
// Prefix: list / get_all / remove_all scoping (6 tests)
// ============================================================================

async fn seed_prefix<D: BackendDriver>(driver: &D) {
    for (key, value) in [
        ("conf:p:1:a", "1a"),
        ("conf:p:1:b", "1b"),
        ("conf:p:10:a", "10a"),
        ("conf:q:1:a", "q1a"),
    ] {
        driver.set(key, &Value::from(value), ValueType::TextString).await.expect("seed");
    }
}

/// `list` returns the leaf names under the prefix and nothing else.
pub async fn prefix_list_returns_leaf_names<D: BackendDriver>(driver: &D) {
    seed_prefix(driver).await;

    let mut names = driver.list("conf:p:1:").await.expect("list");
    names.sort();
    assert_eq!(names, vec!["a", "b"], "list must not leak keys of sibling prefixes");

    let empty = driver.list("conf:nothing:").await.expect("list empty");
    assert!(empty.is_empty());
}

/// `get_all` with a single type maps every leaf to its value.
pub async fn prefix_get_all_returns_leaf_map<D: BackendDriver>(driver: &D) {
    seed_prefix(driver).await;

    let values = driver
        .get_all("conf:p:1:", &TypeSelection::Single(ValueType::TextString))
        .await
        .expect("get_all");
    assert_eq!(values.len(), 2);
    assert_eq!(values["a"], Value::from("1a"));
    assert_eq!(values["b"], Value::from("1b"));
}

/// `get_all` with a mapping decodes each leaf with its own type, falling
/// back to text for unmapped leaves.
pub async fn prefix_get_all_decodes_per_leaf<D: BackendDriver>(driver: &D) {
    driver.set("conf:typed:n", &Value::from(7), ValueType::Number).await.expect("set n");
    driver
        .set("conf:typed:o", &Value::from(json!({ "k": "v" })), ValueType::JsonObject)
        .await
        .expect("set o");
    driver
        .set("conf:typed:b", &Value::from(vec![1u8, 2]), ValueType::ByteString)
        .await
        .expect("set b");
    driver.set("conf:typed:t", &Value::from("7"), ValueType::TextString).await.expect("set t");

    let types = TypeSelection::PerName(HashMap::from([
        ("n".to_owned(), ValueType::Number),
        ("o".to_owned(), ValueType::JsonObject),
        ("b".to_owned(), ValueType::ByteString),
    ]));
    let values = driver.get_all("conf:typed:", &types).await.expect("get_all");

    assert_eq!(values["n"], Value::from(7));
    assert_eq!(values["o"], Value::from(json!({ "k": "v" })));
    assert_eq!(values["b"], Value::Bytes(Bytes::from_static(&[1, 2])));
    assert_eq!(values["t"], Value::from("7"), "unmapped leaves decode as text");
}

/// `remove_all` deletes exactly the keys under the prefix.
pub async fn prefix_remove_all_is_scoped<D: BackendDriver>(driver: &D) {
    seed_prefix(driver).await;

    driver.remove_all("conf:p:1:").await.expect("remove_all");

    assert!(driver.list("conf:p:1:").await.expect("list").is_empty());
    let survivor = driver.get("conf:p:10:a", ValueType::TextString).await.expect("get");
    assert_eq!(survivor, Some(Value::from("10a")), "sibling prefix must survive");
    let other = driver.get("conf:q:1:a", ValueType::TextString).await.expect("get");
    assert_eq!(other, Some(Value::from("q1a")));
}

/// `remove_all` on a prefix with no keys is a no-op, also when repeated.
pub async fn prefix_remove_all_empty_is_noop<D: BackendDriver>(driver: &D) {
    driver.remove_all("conf:none:").await.expect("first remove_all");
    driver.remove_all("conf:none:").await.expect("second remove_all");
}

/// `get_all` on a prefix with no keys returns an empty map.
pub async fn prefix_get_all_empty<D: BackendDriver>(driver: &D) {
    let values = driver
        .get_all("conf:void:", &TypeSelection::PerName(HashMap::new()))
        .await
        .expect("get_all");
    assert!(values.is_empty());
}

// ============================================================================
// Concurrent: Per-key atomicity under parallel access (2 tests)
// ============================================================================

/// Concurrent sets to different keys all succeed.
pub async fn concurrent_sets_to_different_keys<D: BackendDriver + 'static>(driver: Arc<D>) {
    let mut handles = Vec::new();
    for i in 0u32..50 {
        let driver = Arc::clone(&driver);
        handles.push(tokio::spawn(async move {
            let key = format!("conf:conc:{i:04}");
            driver.set(&key, &Value::from(format!("val:{i}")), ValueType::TextString).await
        }));
    }
    for handle in handles {
        handle.await.expect("task join").expect("concurrent set");
    }

    let names = driver.list("conf:conc:").await.expect("list");
    assert_eq!(names.len(), 50, "every concurrent set should be visible");
}

/// Concurrent writers to one key leave exactly one writer's whole value.
pub async fn concurrent_sets_to_same_key_are_atomic<D: BackendDriver + 'static>(driver: Arc<D>) {
    let mut handles = Vec::new();
    for i in 0i64..20 {
        let driver = Arc::clone(&driver);
        handles.push(tokio::spawn(async move {
            let value = Value::from(json!({ "writer": i, "payload": vec![i; 16] }));
            driver.set("conf:same", &value, ValueType::JsonObject).await
        }));
    }
    for handle in handles {
        handle.await.expect("task join").expect("concurrent set");
    }

    let value = driver.get("conf:same", ValueType::JsonObject).await.expect("get");
    let object = value.as_ref().and_then(Value::as_object).expect("an object value");
    let writer = object["writer"].as_i64().expect("writer id");
    assert_eq!(object["payload"], json!(vec![writer; 16]), "value must not mix writers");

    let names = driver.list("conf:same").await.expect("list");
    assert_eq!(names.len(), 1, "one key, no duplicates");
}

// ============================================================================
// Health (1 test)
// ============================================================================

/// `health_check` succeeds on a fresh driver.
pub async fn health_check_succeeds<D: BackendDriver>(driver: &D) {
    let result = driver.health_check().await;
    assert!(result.is_ok(), "fresh driver should be healthy: {result:?}");
}

// ============================================================================
// Convenience runner
// ============================================================================

/// Run the full conformance suite against `driver`.
///
/// Every test uses its own keys, so one driver can run the whole suite.
pub async fn run_all<D: BackendDriver + 'static>(driver: Arc<D>) {
    // CRUD
    crud_get_returns_none_for_missing_key(driver.as_ref()).await;
    crud_set_then_get_returns_value(driver.as_ref()).await;
    crud_set_overwrites_existing(driver.as_ref()).await;
    crud_remove_nonexistent_is_noop(driver.as_ref()).await;
    crud_remove_is_idempotent(driver.as_ref()).await;

    // Codec
    codec_typed_values_round_trip(driver.as_ref()).await;
    codec_text_is_not_parsed(driver.as_ref()).await;
    codec_text_types_render_any_value_as_text(driver.as_ref()).await;
    codec_json_types_keep_the_written_kind(driver.as_ref()).await;
    codec_base64_preference_returns_text(driver.as_ref()).await;
    codec_base64_text_input_reads_as_bytes(driver.as_ref()).await;
    codec_malformed_json_returns_raw(driver.as_ref()).await;
    codec_malformed_base64_returns_raw(driver.as_ref()).await;

    // Prefix
    prefix_list_returns_leaf_names(driver.as_ref()).await;
    prefix_get_all_returns_leaf_map(driver.as_ref()).await;
    prefix_get_all_decodes_per_leaf(driver.as_ref()).await;
    prefix_remove_all_is_scoped(driver.as_ref()).await;
    prefix_remove_all_empty_is_noop(driver.as_ref()).await;
    prefix_get_all_empty(driver.as_ref()).await;

    // Concurrent
    concurrent_sets_to_different_keys(Arc::clone(&driver)).await;
    concurrent_sets_to_same_key_are_atomic(Arc::clone(&driver)).await;

    // Health
    health_check_succeeds(driver.as_ref()).await;
}
