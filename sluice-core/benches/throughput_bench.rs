//! Benchmark: End-to-End Hand-off Throughput
//!
//! Purpose: Measure sustained events/second through submit -> run
//!
//! What's Measured:
//! - Single-thread submit + poll round trip (no cross-core traffic)
//! - Two-thread sustained throughput per wait strategy
//! - Rejection rate when the consumer is slower than the producer
//!
//! Why This Matters:
//! The ring and pool are cheap in isolation; this shows what the full path
//! (fill, publish, validate, handle, release, latency record) costs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sluice_core::core::EventRecord;
use sluice_core::engine::{CancelToken, EventCore};
use sluice_core::testing::order_fields;
use sluice_core::{CoreConfig, WaitStrategyConfig};
use std::thread;

fn config(wait: WaitStrategyConfig) -> CoreConfig {
    CoreConfig {
        pool_capacity: 4096,
        ring_capacity: 1024,
        consumer_wait_strategy: wait,
        ..CoreConfig::default()
    }
}

/// Benchmark: submit + poll on one thread
fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput/round_trip");
    group.significance_level(0.01).sample_size(1000);

    let (mut port, mut consumer, _observer) = EventCore::new(&config(WaitStrategyConfig::Yield))
        .unwrap()
        .split();
    let fields = order_fields(1);
    let mut sink = 0u64;

    group.bench_function("submit_poll", |b| {
        b.iter(|| {
            port.submit(black_box(&fields)).unwrap();
            consumer
                .poll_once(&mut |record: &EventRecord| sink ^= record.sequence)
                .unwrap();
        });
    });
    black_box(sink);

    group.finish();
}

/// Benchmark: sustained cross-thread rate per wait strategy
fn bench_sustained(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput/sustained");
    group.sample_size(10);

    const EVENTS: u64 = 100_000;
    group.throughput(Throughput::Elements(EVENTS));

    let strategies = [
        ("spin", WaitStrategyConfig::Spin { budget: 64 }),
        ("yield", WaitStrategyConfig::Yield),
        ("phased", WaitStrategyConfig::default()),
    ];

    for (name, wait) in strategies {
        group.bench_with_input(BenchmarkId::new("events_100k", name), &wait, |b, wait| {
            b.iter(|| {
                let (mut port, mut consumer, _observer) =
                    EventCore::new(&config(*wait)).unwrap().split();
                let cancel = CancelToken::new();

                let consumer_cancel = cancel.clone();
                let consumer_thread = thread::spawn(move || {
                    let mut seen = 0u64;
                    let mut handler = |_: &EventRecord| {
                        seen += 1;
                        if seen == EVENTS {
                            consumer_cancel.cancel();
                        }
                    };
                    consumer.run(&mut handler, &consumer_cancel).unwrap()
                });

                for q in 1..=EVENTS {
                    while port.submit(&order_fields(q)).is_err() {
                        std::hint::spin_loop();
                    }
                }

                black_box(consumer_thread.join().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_sustained);
criterion_main!(benches);
