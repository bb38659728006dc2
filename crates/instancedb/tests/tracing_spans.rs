//! Integration test verifying that `#[instrument]` annotations produce
//! the expected spans on `DocumentDriver` and façade operations.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use instancedb::{
    Args, BackendDriver, DocumentDriver, MemoryCollection, TypeSelection, Value, ValueType,
    testutil::memory_db,
};
use serde_json::json;
use tracing::{Level, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names and warning messages
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
    warnings: Arc<Mutex<usize>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }

    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() == Level::WARN {
            *self.warnings.lock().expect("lock poisoned") += 1;
        }
    }
}

fn driver() -> DocumentDriver {
    DocumentDriver::new(MemoryCollection::new())
}

// ---------------------------------------------------------------------------
// Driver spans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn document_driver_set_creates_span() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    driver().set("s:k", &Value::from("v"), ValueType::TextString).await.expect("set");

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == "set"), "expected a 'set' span, got: {recorded:?}");
}

#[tokio::test]
async fn document_driver_get_creates_span() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let _ = driver().get("s:missing", ValueType::TextString).await;

    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == "get"), "expected a 'get' span, got: {recorded:?}");
}

#[tokio::test]
async fn document_driver_prefix_operations_create_spans() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let driver = driver();
    let _ = driver.list("s:").await;
    let _ = driver.get_all("s:", &TypeSelection::Single(ValueType::TextString)).await;
    let _ = driver.remove_all("s:").await;
    let _ = driver.remove("s:k").await;

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["list", "get_all", "remove_all", "remove"] {
        assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
    }
}

// ---------------------------------------------------------------------------
// Façade spans
// ---------------------------------------------------------------------------

#[tokio::test]
async fn instance_set_nests_driver_spans() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let db = memory_db();
    let args = Args::new().id("1").invoker("inv").instance(json!({ "parameters": { "p": "v" } }));
    db.instances().set(&args).await.expect("set");

    let recorded = spans.lock().expect("lock poisoned");
    // One façade span, then one driver span for the record and one for `p`.
    let sets = recorded.iter().filter(|s| *s == "set").count();
    assert_eq!(sets, 3, "expected façade and driver 'set' spans, got: {recorded:?}");
}

#[tokio::test]
async fn instance_get_creates_list_spans() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let db = memory_db();
    let args = Args::new().id("1").invoker("inv").instance(json!({ "status": "ok" }));
    db.instances().set(&args).await.expect("set");
    db.instances().get(&args).await.expect("get");

    let recorded = spans.lock().expect("lock poisoned");
    let lists = recorded.iter().filter(|s| *s == "list").count();
    assert_eq!(lists, 2, "parameters and results should both be listed, got: {recorded:?}");
}

// ---------------------------------------------------------------------------
// Degraded reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn degraded_decode_logs_a_warning() {
    let collector = SpanCollector::default();
    let warnings = Arc::clone(&collector.warnings);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let driver = driver();
    driver.set("s:n", &Value::from("seven"), ValueType::TextString).await.expect("set");
    let value = driver.get("s:n", ValueType::Number).await.expect("get");

    assert_eq!(value, Some(Value::from("seven")));
    assert_eq!(*warnings.lock().expect("lock poisoned"), 1);
    assert_eq!(driver.decode_failures(), 1);
}
