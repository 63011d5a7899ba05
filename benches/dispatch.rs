//! Performance benchmarks for txguard
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;
use txguard::channel::MemoryChannel;
use txguard::{
    Alert, AlertDispatcher, ChannelKind, EventLog, FailureEvent, HandlerError, RequestInfo,
    RequestLogEntry, Response, RoutingTable, Severity, SubmitError, TransactionInterceptor,
};

struct DiscardSink;

impl txguard::AlertSink for DiscardSink {
    fn submit(&self, _event: FailureEvent) -> Result<(), SubmitError> {
        Ok(())
    }
}

fn memory_dispatcher() -> AlertDispatcher {
    ChannelKind::ALL
        .into_iter()
        .fold(AlertDispatcher::new(Duration::from_secs(10)), |d, kind| {
            d.with_channel(Arc::new(MemoryChannel::new(kind)))
        })
}

fn bench_event_creation(c: &mut Criterion) {
    let request = RequestInfo::new("POST", "/orders");

    c.bench_function("FailureEvent::transaction_failure", |b| {
        b.iter(|| {
            FailureEvent::transaction_failure(&request, "connection lost", Duration::from_millis(12))
        });
    });

    let event =
        FailureEvent::transaction_failure(&request, "connection lost", Duration::from_millis(12));
    c.bench_function("Alert from FailureEvent", |b| {
        b.iter(|| Alert::from(&event));
    });

    c.bench_function("RequestLogEntry to_json_line", |b| {
        let entry = RequestLogEntry::failed(&event);
        b.iter(|| entry.to_json_line());
    });
}

fn bench_routing(c: &mut Criterion) {
    let routing = RoutingTable::default();

    c.bench_function("RoutingTable resolve CRITICAL", |b| {
        b.iter(|| routing.resolve(Severity::Critical));
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = memory_dispatcher();

    let mut group = c.benchmark_group("dispatch_alert");
    for severity in [Severity::Info, Severity::Warning, Severity::Critical] {
        let alert = Alert::new("Outage", "Database down", severity);
        group.bench_function(severity.as_str(), |b| {
            b.to_async(&rt)
                .iter(|| async { dispatcher.dispatch_alert(&alert).await });
        });
    }
    group.finish();
}

fn bench_interceptor(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let interceptor = TransactionInterceptor::new(Arc::new(DiscardSink), Arc::new(EventLog::new(1000)));
    let request = RequestInfo::new("POST", "/orders");

    c.bench_function("interceptor success", |b| {
        b.to_async(&rt).iter(|| async {
            interceptor
                .handle(&request, async {
                    Ok::<_, HandlerError>(Response::json(200, "{}"))
                })
                .await
                .unwrap()
        });
    });

    c.bench_function("interceptor database failure", |b| {
        b.to_async(&rt).iter(|| async {
            interceptor
                .handle(&request, async {
                    Err::<Response, _>(HandlerError::database("connection lost"))
                })
                .await
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_event_creation,
    bench_routing,
    bench_dispatch,
    bench_interceptor,
);
criterion_main!(benches);
