//! Hand-off Engine
//!
//! Wires the pool and the ring into the two thread-facing halves of the core.
//!
//! ```text
//!  producer thread                                   consumer thread
//!  ───────────────                                   ───────────────
//!  IngestionPort::submit(fields)                     ConsumerLoop::run(handler, cancel)
//!        │                                                  ▲
//!        │ 1. acquire slot ──────┐            ┌──── 4. release slot
//!        │ 2. fill record        ▼            │             │
//!        │                 ┌──────────────────────┐         │
//!        │                 │ EventPool (N records)│         │
//!        │                 └──────────────────────┘         │
//!        │ 3. publish index  ┌────────────────────┐         │
//!        └──────────────────►│ RingBuffer (C idx) │─────────┘
//!                            └────────────────────┘  consume index,
//!                                                    validate, handle
//!
//!  CoreObserver::snapshot()  ── any thread, read-only
//! ```
//!
//! Nothing is allocated after `EventCore::new`.

pub mod consumer;
pub mod ingest;
pub mod wait;

pub use consumer::{ConsumerLoop, EventHandler, Poll, RunReport};
pub use ingest::IngestionPort;
pub use wait::{BusySpin, Blocking, ConfiguredWait, Phased, WaitStrategy, Yielding};

use crate::config::CoreConfig;
use crate::core::{ConfigError, CoreClock, ViolationKind};
use crate::perf::{CoreMetrics, LatencyRecorder, MetricsSnapshot};
use crate::pool::EventPool;
use crate::resilience::{GapDetector, GapPolicy};
use crate::ring::{RingBuffer, RingConsumer, RingProducer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for the consumer loop
///
/// Checked before every consume and after every wait-strategy step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fully constructed, not yet split core
pub struct EventCore {
    pool: Arc<EventPool>,
    producer: RingProducer,
    consumer: RingConsumer,
    metrics: Arc<CoreMetrics>,
    latency: LatencyRecorder,
    config: CoreConfig,
}

impl EventCore {
    /// Validate `config` and allocate every record, slot and counter
    pub fn new(config: &CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut pool = EventPool::new(config.pool_capacity)?;
        pool.warm_up();
        let (producer, consumer) = RingBuffer::new(config.ring_capacity, config.overwrite_on_full)?;
        let latency = LatencyRecorder::new(config.latency_max_ns)?;

        tracing::info!(
            pool_capacity = config.pool_capacity,
            ring_capacity = config.ring_capacity,
            overwrite_on_full = config.overwrite_on_full,
            wait_strategy = ?config.consumer_wait_strategy,
            "Event core initialized"
        );

        Ok(Self {
            pool: Arc::new(pool),
            producer,
            consumer,
            metrics: Arc::new(CoreMetrics::new()),
            latency,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Observer usable before (and after) splitting
    pub fn observer(&self) -> CoreObserver {
        CoreObserver {
            pool: Arc::clone(&self.pool),
            ring: Arc::clone(self.producer.ring()),
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Hand out the producer half, the consumer half and an observer
    ///
    /// Both halves share one clock origin so latencies are comparable.
    pub fn split(self) -> (IngestionPort, ConsumerLoop, CoreObserver) {
        let observer = self.observer();
        let clock = CoreClock::new();

        let port = IngestionPort::new(
            Arc::clone(&self.pool),
            self.producer,
            Arc::clone(&self.metrics),
            clock,
        );
        let consumer = ConsumerLoop::new(
            self.pool,
            self.consumer,
            self.metrics,
            clock,
            GapDetector::new(GapPolicy::for_overwrite(self.config.overwrite_on_full)),
            ConfiguredWait::from_config(&self.config.consumer_wait_strategy),
            self.latency,
        );

        (port, consumer, observer)
    }
}

impl std::fmt::Debug for EventCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCore")
            .field("pool", &self.pool)
            .field("ring", self.producer.ring())
            .field("config", &self.config)
            .finish()
    }
}

/// Read-only view for any number of monitoring threads
#[derive(Debug, Clone)]
pub struct CoreObserver {
    pool: Arc<EventPool>,
    ring: Arc<RingBuffer>,
    metrics: Arc<CoreMetrics>,
}

impl CoreObserver {
    /// Current counters plus approximate occupancy and pool availability
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            occupancy: self.ring.size(),
            pool_available: self.pool.available(),
            ..self.metrics.snapshot()
        }
    }

    pub fn is_halted(&self) -> bool {
        self.metrics.is_halted()
    }

    pub fn violation(&self) -> Option<ViolationKind> {
        self.metrics.violation()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn ring_capacity(&self) -> usize {
        self.ring.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaitStrategyConfig;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_halves_are_send() {
        assert_send::<IngestionPort>();
        assert_send::<ConsumerLoop>();
        assert_send::<CoreObserver>();
        assert_sync::<CoreObserver>();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CoreConfig {
            pool_capacity: 12,
            ..CoreConfig::default()
        };
        assert!(matches!(
            EventCore::new(&config),
            Err(ConfigError::NotPowerOfTwo { .. })
        ));

        let config = CoreConfig {
            consumer_wait_strategy: WaitStrategyConfig::Spin { budget: 0 },
            ..CoreConfig::default()
        };
        assert!(EventCore::new(&config).is_err());
    }

    #[test]
    fn test_fresh_snapshot() {
        let core = EventCore::new(&CoreConfig::default()).unwrap();
        let snapshot = core.observer().snapshot();

        assert_eq!(snapshot.submitted, 0);
        assert_eq!(snapshot.occupancy, 0);
        assert_eq!(snapshot.pool_available, core.config().pool_capacity);
        assert!(!snapshot.is_halted());
    }

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
