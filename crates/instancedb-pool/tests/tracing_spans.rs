//! Span and warning emission of `PoolDriver`.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use instancedb::{BackendDriver, TypeSelection, Value, ValueType};
use instancedb_pool::{
    ConnectionPool, MemoryConnection, MemoryPool, PoolDriver, PoolDriverConfig, PoolError,
    PoolResult, testutil::memory_driver,
};
use tracing::{Level, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

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

/// A pool that refuses every connection handed back.
#[derive(Debug)]
struct LeakyPool(MemoryPool);

#[async_trait]
impl ConnectionPool for LeakyPool {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> PoolResult<MemoryConnection> {
        self.0.acquire().await
    }

    fn release(&self, _connection: MemoryConnection) -> PoolResult<()> {
        Err(PoolError::Release("pool is draining".to_owned()))
    }
}

#[tokio::test]
async fn pool_driver_operations_create_spans() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let driver = memory_driver();
    driver.set("s:k", &Value::from("v"), ValueType::TextString).await.expect("set");
    let _ = driver.get("s:k", ValueType::TextString).await;
    let _ = driver.list("s:").await;
    let _ = driver.get_all("s:", &TypeSelection::Single(ValueType::TextString)).await;
    let _ = driver.remove_all("s:").await;
    let _ = driver.remove("s:k").await;

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["set", "get", "list", "get_all", "remove_all", "remove"] {
        assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
    }
}

#[tokio::test]
async fn failed_release_is_logged_not_returned() {
    let collector = SpanCollector::default();
    let warnings = Arc::clone(&collector.warnings);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let driver = PoolDriver::new(LeakyPool(MemoryPool::new(1)), PoolDriverConfig::default())
        .expect("valid configuration");
    driver.set("s:k", &Value::from("v"), ValueType::TextString).await.expect("set succeeds");

    assert_eq!(*warnings.lock().expect("lock poisoned"), 1);
    // The rejected connection was dropped, so its slot is free again.
    assert_eq!(driver.pool().0.in_use(), 0);
}
