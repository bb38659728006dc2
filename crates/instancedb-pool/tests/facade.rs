//! Façade scenarios over the pool driver.

#![allow(clippy::expect_used, clippy::panic)]

use instancedb::testutil;
use instancedb_pool::{MemoryPool, testutil::pool_db};

fn pooled_db() -> instancedb::InstanceDb {
    pool_db(&MemoryPool::default())
}

#[tokio::test]
async fn instance_without_parameters() {
    testutil::scenario_instance_without_parameters(&pooled_db()).await;
}

#[tokio::test]
async fn instance_update_overwrites_parameters() {
    testutil::scenario_instance_update_overwrites_parameters(&pooled_db()).await;
}

#[tokio::test]
async fn get_does_not_embed_by_default() {
    testutil::scenario_get_does_not_embed_by_default(&pooled_db()).await;
}

#[tokio::test]
async fn get_missing_instance() {
    testutil::scenario_get_missing_instance(&pooled_db()).await;
}

#[tokio::test]
async fn get_all_by_status() {
    testutil::scenario_get_all_by_status(&pooled_db()).await;
}

#[tokio::test]
async fn remove_clears_everything() {
    testutil::scenario_remove_clears_everything(&pooled_db()).await;
}

#[tokio::test]
async fn remove_is_idempotent() {
    testutil::scenario_remove_is_idempotent(&pooled_db()).await;
}

#[tokio::test]
async fn empty_parameters_are_skipped() {
    testutil::scenario_empty_parameters_are_skipped(&pooled_db()).await;
}

#[tokio::test]
async fn embedding() {
    testutil::scenario_embedding(&pooled_db()).await;
}

#[tokio::test]
async fn get_all_with_embed_list() {
    testutil::scenario_get_all_with_embed_list(&pooled_db()).await;
}

#[tokio::test]
async fn parameter_set_get() {
    testutil::scenario_parameter_set_get(&pooled_db()).await;
}

#[tokio::test]
async fn parameters_get_all() {
    testutil::scenario_parameters_get_all(&pooled_db()).await;
}

#[tokio::test]
async fn result_set_get() {
    testutil::scenario_result_set_get(&pooled_db()).await;
}

#[tokio::test]
async fn results_get_all() {
    testutil::scenario_results_get_all(&pooled_db()).await;
}

#[tokio::test]
async fn typed_fields() {
    testutil::scenario_typed_fields(&pooled_db()).await;
}

#[tokio::test]
async fn untyped_values_read_back_as_text() {
    testutil::scenario_untyped_values_read_back_as_text(&pooled_db()).await;
}

#[tokio::test]
async fn binary_parameter() {
    testutil::scenario_binary_parameter(&pooled_db()).await;
}

#[tokio::test]
async fn validation_rejects_before_io() {
    testutil::scenario_validation_rejects_before_io(&pooled_db()).await;
}

#[tokio::test]
async fn all_scenarios_share_one_handle() {
    testutil::run_all_scenarios(&pooled_db()).await;
}

#[tokio::test]
async fn values_are_stored_in_their_raw_string_form() {
    let pool = MemoryPool::default();
    let db = pool_db(&pool);

    let args = instancedb::Args::new().id("401").executable(testutil::TYPED_EXECUTABLE).instance(
        serde_json::json!({
            "status": "running",
            "parameters": { "image": "AAEC", "retries": 3 },
            "results": { "done": true }
        }),
    );
    db.instances().set(&args).await.expect("set");

    let keys = db.keys();
    let owner = instancedb::Owner::executable(testutil::TYPED_EXECUTABLE);
    let record = pool.raw(&keys.instance_key(&owner, instancedb::Target::Named("401")));
    assert_eq!(record.as_deref(), Some(r#"{"status":"running"}"#));

    let field = |kind, name| {
        pool.raw(&keys.field_key(kind, &owner, "401", instancedb::Target::Named(name)))
    };
    assert_eq!(field(instancedb::FieldKind::Parameter, "image").as_deref(), Some("AAEC"));
    assert_eq!(field(instancedb::FieldKind::Parameter, "retries").as_deref(), Some("3"));
    assert_eq!(field(instancedb::FieldKind::Result, "done").as_deref(), Some("true"));
    assert_eq!(pool.in_use(), 0);
}
