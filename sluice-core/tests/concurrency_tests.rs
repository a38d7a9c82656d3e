//! Two-thread stress tests
//!
//! One producer thread, one consumer thread, real contention on the ring
//! cursors and the pool free list.

use sluice_core::core::{EventRecord, Rejected};
use sluice_core::engine::{CancelToken, EventCore};
use sluice_core::testing::order_fields;
use sluice_core::{CoreConfig, WaitStrategyConfig};
use std::thread;

const EVENTS: u64 = 200_000;

fn core(pool: usize, ring: usize, overwrite: bool, wait: WaitStrategyConfig) -> EventCore {
    EventCore::new(&CoreConfig {
        pool_capacity: pool,
        ring_capacity: ring,
        overwrite_on_full: overwrite,
        consumer_wait_strategy: wait,
        ..CoreConfig::default()
    })
    .expect("valid config")
}

/// Test: every event arrives exactly once, in order, under contention
#[test]
fn test_reject_mode_exactly_once_in_order() {
    for wait in [
        WaitStrategyConfig::Spin { budget: 16 },
        WaitStrategyConfig::Yield,
        WaitStrategyConfig::default(),
    ] {
        let (mut port, mut consumer, observer) = core(256, 64, false, wait).split();
        let cancel = CancelToken::new();

        let consumer_cancel = cancel.clone();
        let consumer_thread = thread::spawn(move || {
            let mut expected = 1u64;
            let mut handler = |record: &EventRecord| {
                assert_eq!(record.sequence, expected, "out of order");
                assert_eq!(record.quantity, expected, "payload mismatch");
                if expected == EVENTS {
                    consumer_cancel.cancel();
                }
                expected += 1;
            };
            consumer.run(&mut handler, &consumer_cancel)
        });

        let producer_thread = thread::spawn(move || {
            let mut rejected = 0u64;
            for q in 1..=EVENTS {
                loop {
                    match port.submit(&order_fields(q)) {
                        Ok(sequence) => {
                            assert_eq!(sequence, q);
                            break;
                        }
                        Err(Rejected::Halted) => panic!("core halted"),
                        Err(_) => {
                            rejected += 1;
                            std::hint::spin_loop();
                        }
                    }
                }
            }
            rejected
        });

        let rejected = producer_thread.join().expect("producer panicked");
        let report = consumer_thread
            .join()
            .expect("consumer panicked")
            .expect("invariant violation");

        assert_eq!(report.processed, EVENTS);
        assert_eq!(report.last_sequence, EVENTS);
        assert_eq!(report.abandoned, 0);
        assert_eq!(report.latency.count, EVENTS);

        let snapshot = observer.snapshot();
        assert_eq!(snapshot.submitted, EVENTS);
        assert_eq!(snapshot.processed, EVENTS);
        assert_eq!(snapshot.rejected_total(), rejected);
        assert_eq!(snapshot.pool_available, 256);
        assert!(!snapshot.is_halted());
    }
}

/// Test: overwrite mode never duplicates and accounts for every event
///
/// Verifies that:
/// - sequences seen by the consumer strictly increase
/// - processed + dropped == submitted
/// - no slot leaks
#[test]
fn test_overwrite_mode_accounts_for_every_event() {
    overwrite_accounting(64, 16);
}

/// Test: same accounting when the pool runs out before the ring fills
#[test]
fn test_overwrite_mode_with_pool_equal_to_ring() {
    overwrite_accounting(8, 8);
}

fn overwrite_accounting(pool: usize, ring: usize) {
    let (mut port, mut consumer, observer) =
        core(pool, ring, true, WaitStrategyConfig::Spin { budget: 4 }).split();
    let cancel = CancelToken::new();

    let consumer_cancel = cancel.clone();
    let consumer_thread = thread::spawn(move || {
        let mut last = 0u64;
        let mut seen = 0u64;
        let mut handler = |record: &EventRecord| {
            assert!(record.sequence > last, "duplicate or regression");
            assert_eq!(record.quantity, record.sequence);
            last = record.sequence;
            seen += 1;
        };
        let report = consumer.run(&mut handler, &consumer_cancel)?;
        let drained = consumer.drain(&mut handler)?;
        Ok::<_, sluice_core::InvariantViolation>((report, drained, seen))
    });

    for q in 1..=EVENTS {
        assert_eq!(port.submit(&order_fields(q)), Ok(q));
    }
    cancel.cancel();

    let (report, drained, seen) = consumer_thread
        .join()
        .expect("consumer panicked")
        .expect("invariant violation");

    let snapshot = observer.snapshot();
    assert_eq!(report.processed + drained, seen);
    assert_eq!(snapshot.submitted, EVENTS);
    assert_eq!(snapshot.processed + snapshot.dropped, EVENTS);
    assert_eq!(snapshot.pool_available, pool);
    assert_eq!(snapshot.occupancy, 0);
    assert!(!snapshot.is_halted());
}

/// Test: an observer thread can snapshot while both halves run
#[test]
fn test_concurrent_observer() {
    let (mut port, mut consumer, observer) =
        core(128, 32, false, WaitStrategyConfig::Yield).split();
    let cancel = CancelToken::new();

    let consumer_cancel = cancel.clone();
    let consumer_thread = thread::spawn(move || {
        let mut count = 0u64;
        let mut handler = |_: &EventRecord| {
            count += 1;
            if count == 50_000 {
                consumer_cancel.cancel();
            }
        };
        consumer.run(&mut handler, &consumer_cancel)
    });

    let watcher = observer.clone();
    let observer_thread = thread::spawn(move || {
        let mut last_processed = 0;
        while !watcher.is_halted() {
            let snapshot = watcher.snapshot();
            assert!(snapshot.processed >= last_processed, "counter went backwards");
            assert!(snapshot.occupancy <= 32);
            last_processed = snapshot.processed;
            if last_processed == 50_000 {
                break;
            }
            thread::yield_now();
        }
    });

    for q in 1..=50_000u64 {
        while port.submit(&order_fields(q)).is_err() {
            thread::yield_now();
        }
    }

    consumer_thread.join().unwrap().unwrap();
    observer_thread.join().unwrap();
    assert_eq!(observer.snapshot().processed, 50_000);
}
