//! Dispatch benchmarks for the mediator

use coordix::prelude::*;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

struct Ping(u64);

impl Request for Ping {
    type Response = u64;
}

struct PingHandler;

#[async_trait]
impl RequestHandler<Ping> for PingHandler {
    async fn handle(&self, request: Ping, _: &CancellationToken) -> Result<u64, HandlerError> {
        Ok(request.0 + 1)
    }
}

struct Touched;

impl Notification for Touched {}

struct NoopHandler;

#[async_trait]
impl NotificationHandler<Touched> for NoopHandler {
    async fn handle(&self, _: &Touched, _: &CancellationToken) -> Result<(), HandlerError> {
        Ok(())
    }
}

fn mediator_with_listeners(listeners: usize) -> Mediator {
    let mut services = ServiceCollection::new();
    services
        .add_request_handler_with::<Ping, _, _>(|_| PingHandler)
        .unwrap();
    for _ in 0..listeners {
        services.add_notification_handler_with::<Touched, _, _>(|_| NoopHandler);
    }
    services.build().mediator()
}

fn send_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mediator = mediator_with_listeners(0);
    let token = CancellationToken::new();

    let mut group = c.benchmark_group("send");
    group.throughput(Throughput::Elements(1));

    group.bench_function("request_response", |b| {
        b.to_async(&rt)
            .iter(|| async { mediator.send(black_box(Ping(1)), &token).await.unwrap() });
    });

    group.bench_function("handler_not_found", |b| {
        let empty = ServiceCollection::new().build().mediator();
        b.to_async(&rt)
            .iter(|| async { empty.send(black_box(Ping(1)), &token).await.is_err() });
    });

    group.finish();
}

fn publish_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let token = CancellationToken::new();

    let mut group = c.benchmark_group("publish");

    for listeners in [0usize, 1, 4, 16] {
        let mediator = mediator_with_listeners(listeners);
        group.throughput(Throughput::Elements(listeners.max(1) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(listeners), &listeners, |b, _| {
            b.to_async(&rt)
                .iter(|| async { mediator.publish(black_box(&Touched), &token).await.unwrap() });
        });
    }

    group.finish();
}

criterion_group!(benches, send_benchmark, publish_benchmark);

criterion_main!(benches);
