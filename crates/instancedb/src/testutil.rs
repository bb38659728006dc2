//! Shared test utilities and the façade scenario suite.
//!
//! This module is feature-gated behind `testutil` to prevent leaking into
//! production builds. It provides a sample API schema, handle constructors
//! and a set of end-to-end scenarios that exercise the façades against any
//! driver. Each driver crate runs the scenarios over its own engine, so the
//! two drivers are held to identical observable behavior.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! instancedb = { path = "../instancedb", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! use instancedb::testutil::{self, memory_db};
//!
//! #[tokio::test]
//! async fn scenarios() {
//!     testutil::run_all_scenarios(&memory_db()).await;
//! }
//! ```

use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;

use crate::{
    ApiSchema, Args, BackendDriver, DbResult, DocumentDriver, Embed, InstanceDb,
    InstanceDbConfig, MemoryCollection, Value,
};

/// Owner name used by the scenarios for executable-owned instances.
pub const EXECUTABLE: &str = "textexec";

/// Owner name used by the scenarios for invoker-owned instances.
pub const INVOKER: &str = "testinv";

/// Executable with typed fields declared in [`sample_schema`].
pub const TYPED_EXECUTABLE: &str = "convert";

/// A schema declaring one field of every interesting type.
///
/// `convert` has parameters `image` (binary), `options` (object) and
/// `retries` (number), and results `done` (boolean) and `pages` (array).
#[must_use]
pub fn sample_schema() -> ApiSchema {
    let schema = json!({
        "executables": {
            TYPED_EXECUTABLE: {
                "parameters_schema": {
                    "image": { "type": "binary" },
                    "options": { "type": "json_object" },
                    "retries": { "type": "number" }
                },
                "results_schema": {
                    "done": { "type": "boolean" },
                    "pages": { "type": "json_array" }
                }
            }
        },
        "invokers": {
            INVOKER: { "parameters_schema": { "port": { "type": "number" } } }
        }
    });

    match serde_json::from_value(schema) {
        Ok(schema) => schema,
        Err(err) => panic!("sample schema must deserialize: {err}"),
    }
}

/// Creates a handle over `driver` with [`sample_schema`] and the default
/// configuration.
#[must_use]
pub fn db_over(driver: Arc<dyn BackendDriver>) -> InstanceDb {
    match InstanceDb::builder()
        .config(InstanceDbConfig::default())
        .driver(driver)
        .schema(sample_schema())
        .build()
    {
        Ok(db) => db,
        Err(err) => panic!("default configuration must be valid: {err}"),
    }
}

/// Creates a handle over a fresh [`MemoryCollection`] with
/// [`sample_schema`].
#[must_use]
pub fn memory_db() -> InstanceDb {
    db_over(Arc::new(DocumentDriver::new(MemoryCollection::new())))
}

/// Arguments addressing instance `id` of the scenario invoker.
#[must_use]
pub fn invoker_args(id: &str) -> Args {
    Args::new().id(id).invoker(INVOKER)
}

/// Arguments addressing instance `id` of the scenario executable.
#[must_use]
pub fn executable_args(id: &str) -> Args {
    Args::new().id(id).executable(EXECUTABLE)
}

/// Returns `true` if the result is an `InvalidArgument` error.
pub fn is_invalid_argument<T>(result: &DbResult<T>) -> bool {
    result.as_ref().err().is_some_and(crate::DbError::is_invalid_argument)
}

// ============================================================================
// Instances
// ============================================================================

/// An instance without parameters reads back with empty stored-name lists.
pub async fn scenario_instance_without_parameters(db: &InstanceDb) {
    let args = executable_args("1").instance(json!({ "created": "1970-01-01" }));
    db.instances().set(&args).await.expect("set");

    let instance = db.instances().get(&args).await.expect("get").expect("instance exists");
    assert_eq!(instance.id, "1");
    assert_eq!(instance.fields.get("created"), Some(&json!("1970-01-01")));
    assert!(instance.parameters_stored.is_empty());
    assert!(instance.results_stored.is_empty());
    assert!(instance.parameters.is_none());
    assert!(instance.results.is_none());
}

/// Setting an existing instance again overwrites its parameters.
pub async fn scenario_instance_update_overwrites_parameters(db: &InstanceDb) {
    let first = invoker_args("2").instance(json!({
        "created": "1970-01-02",
        "status": "running",
        "parameters": { "foo": "bar" }
    }));
    db.instances().set(&first).await.expect("first set");

    let second = invoker_args("2").instance(json!({
        "created": "1970-01-02",
        "status": "running",
        "parameters": { "foo": "nop" }
    }));
    db.instances().set(&second).await.expect("second set");

    let foo = db.parameters().get(&invoker_args("2").name("foo")).await.expect("get foo");
    assert_eq!(foo, Some(Value::from("nop")));

    let instance = db.instances().get(&invoker_args("2")).await.expect("get").expect("exists");
    assert_eq!(instance.parameters_stored, vec!["foo"]);
    assert_eq!(instance.status(), Some(&json!("running")));
    assert!(!instance.fields.contains_key("parameters"), "parameters are never stored inline");
}

/// `get` does not embed values unless asked to.
pub async fn scenario_get_does_not_embed_by_default(db: &InstanceDb) {
    let args = invoker_args("11")
        .instance(json!({ "created": "1970-01-01", "parameters": { "foo": "bar" } }));
    db.instances().set(&args).await.expect("set");

    let instance = db.instances().get(&args).await.expect("get").expect("exists");
    assert!(instance.parameters.is_none());
    assert_eq!(instance.fields.get("created"), Some(&json!("1970-01-01")));
    assert_eq!(instance.parameters_stored, vec!["foo"]);
}

/// `get` of an unknown instance is `None`.
pub async fn scenario_get_missing_instance(db: &InstanceDb) {
    let found = db.instances().get(&invoker_args("no-such-instance")).await.expect("get");
    assert!(found.is_none());
}

/// `get_all` with a status keeps only matching instances.
pub async fn scenario_get_all_by_status(db: &InstanceDb) {
    for (id, status) in [("31", "running"), ("32", "done")] {
        let args = invoker_args(id).instance(json!({ "status": status }));
        db.instances().set(&args).await.expect("set");
    }

    let running = db
        .instances()
        .get_all(&Args::new().invoker(INVOKER).status("running"))
        .await
        .expect("get_all");
    assert!(!running.is_empty());
    assert!(running.contains_key("31"));
    assert!(!running.contains_key("32"));
    assert!(running.values().all(|record| record.get("status") == Some(&json!("running"))));

    let everything = db.instances().get_all(&Args::new().invoker(INVOKER)).await.expect("all");
    assert!(everything.contains_key("32"));
}

/// `remove` deletes the record with every parameter and result.
pub async fn scenario_remove_clears_everything(db: &InstanceDb) {
    let args = invoker_args("21").instance(json!({
        "created": "1970-01-01",
        "parameters": { "foo": "bar" },
        "results": { "out": "x" }
    }));
    db.instances().set(&args).await.expect("set");
    db.instances().remove(&args).await.expect("remove");

    assert!(db.instances().get(&args).await.expect("get").is_none());
    assert!(db.parameters().list(&args).await.expect("list parameters").is_empty());
    assert!(db.results().list(&args).await.expect("list results").is_empty());
    assert!(db.parameters().get_all(&args).await.expect("get_all").is_empty());
}

/// `remove` of a missing instance, and a repeated `remove`, succeed.
pub async fn scenario_remove_is_idempotent(db: &InstanceDb) {
    let args = invoker_args("22");
    db.instances().remove(&args).await.expect("remove missing");

    let with_payload = args.clone().instance(json!({ "parameters": { "p": "v" } }));
    db.instances().set(&with_payload).await.expect("set");
    db.instances().remove(&args).await.expect("first remove");
    db.instances().remove(&args).await.expect("second remove");
    assert!(db.instances().get(&args).await.expect("get").is_none());
}

/// Empty values (null, `false`, zero, `""`) are skipped when unpacking
/// parameters.
pub async fn scenario_empty_parameters_are_skipped(db: &InstanceDb) {
    let args = invoker_args("41").instance(json!({
        "parameters": {
            "blank": "", "missing": null, "off": false, "zero": 0, "kept": "x", "on": true
        }
    }));
    db.instances().set(&args).await.expect("set");

    let instance = db.instances().get(&args).await.expect("get").expect("exists");
    assert_eq!(instance.parameters_stored, vec!["kept", "on"]);
}

/// Embedding selects all values or exactly the named ones.
pub async fn scenario_embedding(db: &InstanceDb) {
    let args = invoker_args("51").instance(json!({
        "parameters": { "a": "1", "b": "2" },
        "results": { "r": "done" }
    }));
    db.instances().set(&args).await.expect("set");

    let query = invoker_args("51")
        .embed_parameters(Embed::names(["a", "not-stored"]))
        .embed_results(Embed::All);
    let instance = db.instances().get(&query).await.expect("get").expect("exists");

    let parameters = instance.parameters.clone().expect("parameters embedded");
    assert_eq!(parameters.len(), 1);
    assert_eq!(parameters["a"], Value::from("1"));
    let results = instance.results.clone().expect("results embedded");
    assert_eq!(results["r"], Value::from("done"));
    assert_eq!(instance.parameters_stored, vec!["a", "b"]);

    let document = instance.into_document();
    assert_eq!(document["id"], json!("51"));
    assert_eq!(document["parameters"], json!({ "a": "1" }));
    assert_eq!(document["results_stored"], json!(["r"]));
}

/// `parameters.get_all` with an embed list returns exactly the named
/// values.
pub async fn scenario_get_all_with_embed_list(db: &InstanceDb) {
    let args = invoker_args("52").instance(json!({ "parameters": { "a": "1", "b": "2" } }));
    db.instances().set(&args).await.expect("set");

    let values = db
        .parameters()
        .get_all(&invoker_args("52").embed_parameters(Embed::names(["a"])))
        .await
        .expect("get_all");
    assert_eq!(values.len(), 1);
    assert_eq!(values["a"], Value::from("1"));
}

// ============================================================================
// Parameters and results
// ============================================================================

/// A parameter set on its own reads back.
pub async fn scenario_parameter_set_get(db: &InstanceDb) {
    let mut args =
        invoker_args("101").instance(json!({ "created": "1970-01-01", "status": "running" }));
    args.parameter_name = Some("foo".to_owned());
    args = args.value("bar");

    db.instances().set(&args).await.expect("set instance");
    db.parameters().set(&args).await.expect("set parameter");
    assert_eq!(db.parameters().get(&args).await.expect("get"), Some(Value::from("bar")));
}

/// Every parameter of an instance comes back from `get_all`.
pub async fn scenario_parameters_get_all(db: &InstanceDb) {
    let args = invoker_args("102").instance(json!({
        "created": "1970-01-01",
        "status": "running",
        "parameters": { "foo": "bar", "fox": "bay" }
    }));
    db.instances().set(&args).await.expect("set");

    let values = db.parameters().get_all(&args).await.expect("get_all");
    assert_eq!(values["foo"], Value::from("bar"));
    assert_eq!(values["fox"], Value::from("bay"));
}

/// A result set on its own reads back.
pub async fn scenario_result_set_get(db: &InstanceDb) {
    let mut args =
        invoker_args("201").instance(json!({ "created": "1970-01-01", "status": "running" }));
    args.result_name = Some("foo".to_owned());
    args = args.value("bar");

    db.instances().set(&args).await.expect("set instance");
    db.results().set(&args).await.expect("set result");
    assert_eq!(db.results().get(&args).await.expect("get"), Some(Value::from("bar")));
    assert_eq!(db.parameters().list(&args).await.expect("list"), Vec::<String>::new());
}

/// Every result of an instance comes back from `get_all`.
pub async fn scenario_results_get_all(db: &InstanceDb) {
    let args = invoker_args("202").instance(json!({
        "created": "1970-01-01",
        "status": "running",
        "results": { "foo": "bar", "fox": "bay" }
    }));
    db.instances().set(&args).await.expect("set");

    let values = db.results().get_all(&args).await.expect("get_all");
    assert_eq!(values["foo"], Value::from("bar"));
    assert_eq!(values["fox"], Value::from("bay"));
}

/// Declared types drive decoding, per leaf, for values unpacked from an
/// instance payload.
pub async fn scenario_typed_fields(db: &InstanceDb) {
    let addr = Args::new().id("301").executable(TYPED_EXECUTABLE);
    let args = addr.clone().instance(json!({
        "parameters": { "image": "AAEC", "options": { "dpi": 300 }, "retries": 3, "note": "hi" },
        "results": { "done": true, "pages": [1, 2] }
    }));
    db.instances().set(&args).await.expect("set");

    let parameters = db.parameters().get_all(&addr).await.expect("get_all parameters");
    assert_eq!(parameters["image"], Value::Bytes(Bytes::from_static(&[0, 1, 2])));
    assert_eq!(parameters["options"], Value::from(json!({ "dpi": 300 })));
    assert_eq!(parameters["retries"], Value::from(3));
    assert_eq!(parameters["note"], Value::from("hi"));

    let results = db.results().get_all(&addr).await.expect("get_all results");
    assert_eq!(results["done"], Value::from(true));
    assert_eq!(results["pages"], Value::from(json!([1, 2])));

    let as_text = db
        .parameters()
        .get(&addr.clone().name("image").prefer_base64(true))
        .await
        .expect("get image");
    assert_eq!(as_text, Some(Value::from("AAEC")));
}

/// Fields without a declared type read back as text, whatever was written.
pub async fn scenario_untyped_values_read_back_as_text(db: &InstanceDb) {
    let addr = Args::new().id("303").executable(TYPED_EXECUTABLE);
    let args = addr.clone().instance(json!({
        "parameters": { "note": 3, "opts": { "a": 1 }, "retries": "7" }
    }));
    db.instances().set(&args).await.expect("set");

    let parameters = db.parameters().get_all(&addr).await.expect("get_all");
    assert_eq!(parameters["note"], Value::from("3"));
    assert_eq!(parameters["opts"], Value::from(r#"{"a":1}"#));
    // `retries` is a declared number; text written to it stays text.
    assert_eq!(parameters["retries"], Value::from("7"));
}

/// Raw bytes set through the parameter façade survive a round trip.
pub async fn scenario_binary_parameter(db: &InstanceDb) {
    let args = Args::new().id("302").executable(TYPED_EXECUTABLE).name("image");
    let payload = Bytes::from_static(b"\x89PNG\r\n\x1a\n");
    db.parameters().set(&args.clone().value(payload.clone())).await.expect("set");

    assert_eq!(db.parameters().get(&args).await.expect("get"), Some(Value::Bytes(payload)));
}

// ============================================================================
// Validation
// ============================================================================

/// Invalid arguments are rejected before any write happens.
pub async fn scenario_validation_rejects_before_io(db: &InstanceDb) {
    let owner = "validation-owner";
    let no_id = Args::new().invoker(owner).instance(json!({ "status": "x" }));
    assert!(is_invalid_argument(&db.instances().set(&no_id).await));

    let no_owner = Args::new().id("1").instance(json!({ "status": "x" }));
    assert!(is_invalid_argument(&db.instances().set(&no_owner).await));

    let no_value = Args::new().id("1").invoker(owner).name("p");
    assert!(is_invalid_argument(&db.parameters().set(&no_value).await));
    for falsy in [Value::from(false), Value::from(0), Value::from(""), Value::Null] {
        let args = no_value.clone().value(falsy);
        assert!(is_invalid_argument(&db.parameters().set(&args).await));
    }

    let no_name = Args::new().id("1").invoker(owner).value("v");
    assert!(is_invalid_argument(&db.results().set(&no_name).await));

    let stored = db.instances().get_all(&Args::new().invoker(owner)).await.expect("get_all");
    assert!(stored.is_empty(), "rejected calls must not write");
    let names = db.parameters().list(&Args::new().id("1").invoker(owner)).await.expect("list");
    assert!(names.is_empty(), "rejected calls must not write");
}

// ============================================================================
// Convenience runner
// ============================================================================

/// Run every scenario against one handle.
///
/// Scenarios use distinct instance ids, so they can share a handle.
pub async fn run_all_scenarios(db: &InstanceDb) {
    scenario_instance_without_parameters(db).await;
    scenario_instance_update_overwrites_parameters(db).await;
    scenario_get_does_not_embed_by_default(db).await;
    scenario_get_missing_instance(db).await;
    scenario_get_all_by_status(db).await;
    scenario_remove_clears_everything(db).await;
    scenario_remove_is_idempotent(db).await;
    scenario_empty_parameters_are_skipped(db).await;
    scenario_embedding(db).await;
    scenario_get_all_with_embed_list(db).await;
    scenario_parameter_set_get(db).await;
    scenario_parameters_get_all(db).await;
    scenario_result_set_get(db).await;
    scenario_results_get_all(db).await;
    scenario_typed_fields(db).await;
    scenario_untyped_values_read_back_as_text(db).await;
    scenario_binary_parameter(db).await;
    scenario_validation_rejects_before_io(db).await;
}
