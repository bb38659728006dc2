//! Conformance test suite for `DocumentDriver` over `MemoryCollection`.
//!
//! Each test function corresponds to a single conformance check, providing
//! fine-grained failure reporting. The `run_all` test exercises the full
//! suite as a one-liner to verify no tests are accidentally omitted.

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use instancedb::{DocumentDriver, MemoryCollection, conformance};

fn driver() -> DocumentDriver {
    DocumentDriver::new(MemoryCollection::new())
}

// ============================================================================
// CRUD (5 tests)
// ============================================================================

#[tokio::test]
async fn crud_get_returns_none_for_missing_key() {
    conformance::crud_get_returns_none_for_missing_key(&driver()).await;
}

#[tokio::test]
async fn crud_set_then_get_returns_value() {
    conformance::crud_set_then_get_returns_value(&driver()).await;
}

#[tokio::test]
async fn crud_set_overwrites_existing() {
    conformance::crud_set_overwrites_existing(&driver()).await;
}

#[tokio::test]
async fn crud_remove_nonexistent_is_noop() {
    conformance::crud_remove_nonexistent_is_noop(&driver()).await;
}

#[tokio::test]
async fn crud_remove_is_idempotent() {
    conformance::crud_remove_is_idempotent(&driver()).await;
}

// ============================================================================
// Codec (8 tests)
// ============================================================================

#[tokio::test]
async fn codec_typed_values_round_trip() {
    conformance::codec_typed_values_round_trip(&driver()).await;
}

#[tokio::test]
async fn codec_text_is_not_parsed() {
    conformance::codec_text_is_not_parsed(&driver()).await;
}

#[tokio::test]
async fn codec_text_types_render_any_value_as_text() {
    conformance::codec_text_types_render_any_value_as_text(&driver()).await;
}

#[tokio::test]
async fn codec_json_types_keep_the_written_kind() {
    conformance::codec_json_types_keep_the_written_kind(&driver()).await;
}

#[tokio::test]
async fn codec_base64_preference_returns_text() {
    conformance::codec_base64_preference_returns_text(&driver()).await;
}

#[tokio::test]
async fn codec_base64_text_input_reads_as_bytes() {
    conformance::codec_base64_text_input_reads_as_bytes(&driver()).await;
}

#[tokio::test]
async fn codec_malformed_json_returns_raw() {
    conformance::codec_malformed_json_returns_raw(&driver()).await;
}

#[tokio::test]
async fn codec_malformed_base64_returns_raw() {
    conformance::codec_malformed_base64_returns_raw(&driver()).await;
}

// ============================================================================
// Prefix (6 tests)
// ============================================================================

#[tokio::test]
async fn prefix_list_returns_leaf_names() {
    conformance::prefix_list_returns_leaf_names(&driver()).await;
}

#[tokio::test]
async fn prefix_get_all_returns_leaf_map() {
    conformance::prefix_get_all_returns_leaf_map(&driver()).await;
}

#[tokio::test]
async fn prefix_get_all_decodes_per_leaf() {
    conformance::prefix_get_all_decodes_per_leaf(&driver()).await;
}

#[tokio::test]
async fn prefix_remove_all_is_scoped() {
    conformance::prefix_remove_all_is_scoped(&driver()).await;
}

#[tokio::test]
async fn prefix_remove_all_empty_is_noop() {
    conformance::prefix_remove_all_empty_is_noop(&driver()).await;
}

#[tokio::test]
async fn prefix_get_all_empty() {
    conformance::prefix_get_all_empty(&driver()).await;
}

// ============================================================================
// Concurrent (2 tests)
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sets_to_different_keys() {
    conformance::concurrent_sets_to_different_keys(Arc::new(driver())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sets_to_same_key_are_atomic() {
    conformance::concurrent_sets_to_same_key_are_atomic(Arc::new(driver())).await;
}

// ============================================================================
// Health (1 test)
// ============================================================================

#[tokio::test]
async fn health_check_succeeds() {
    conformance::health_check_succeeds(&driver()).await;
}

// ============================================================================
// Full suite
// ============================================================================

#[tokio::test]
async fn run_all() {
    conformance::run_all(Arc::new(driver())).await;
}
