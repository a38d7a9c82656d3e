//! Consumer side: dequeue, validate, process, release

use super::wait::{ConfiguredWait, WaitStrategy};
use super::CancelToken;
use crate::core::{ConsumeError, CoreClock, EventRecord, InvariantViolation, ViolationKind};
use crate::perf::{CoreMetrics, LatencyRecorder, LatencySummary};
use crate::pool::EventPool;
use crate::resilience::GapDetector;
use crate::ring::RingConsumer;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Processing collaborator invoked for every consumed event
///
/// The record is only borrowed for the duration of the call; its slot goes
/// back to the pool right after.
pub trait EventHandler {
    fn on_event(&mut self, record: &EventRecord);
}

impl<F> EventHandler for F
where
    F: FnMut(&EventRecord),
{
    #[inline(always)]
    fn on_event(&mut self, record: &EventRecord) {
        self(record)
    }
}

/// Result of a single non-waiting poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// One event was processed
    Processed { sequence: u64 },
    /// Nothing was published
    Empty,
}

/// Summary returned when `ConsumerLoop::run` stops on cancellation
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Events processed during this run
    pub processed: u64,
    /// Events left unprocessed in the ring at cancellation
    pub abandoned: u64,
    /// Last sequence number processed (0 if none ever was)
    pub last_sequence: u64,
    /// Sequences skipped because overwrite-on-full evicted them
    pub skipped: u64,
    /// Publish -> processed latency over the consumer's lifetime
    pub latency: LatencySummary,
    pub elapsed: Duration,
}

impl RunReport {
    /// Events per second over the run
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Consumer-side handle of the core
///
/// `Send` but not `Clone`: exactly one thread consumes events.
pub struct ConsumerLoop {
    pool: Arc<EventPool>,
    ring: RingConsumer,
    metrics: Arc<CoreMetrics>,
    clock: CoreClock,
    gaps: GapDetector,
    wait: ConfiguredWait,
    latency: LatencyRecorder,
    /// First violation seen; the loop refuses to continue after it
    halted: Option<InvariantViolation>,
}

impl ConsumerLoop {
    pub(crate) fn new(
        pool: Arc<EventPool>,
        ring: RingConsumer,
        metrics: Arc<CoreMetrics>,
        clock: CoreClock,
        gaps: GapDetector,
        wait: ConfiguredWait,
        latency: LatencyRecorder,
    ) -> Self {
        Self {
            pool,
            ring,
            metrics,
            clock,
            gaps,
            wait,
            latency,
            halted: None,
        }
    }

    /// Process events in publish order until `cancel` is raised
    ///
    /// Applies the configured wait strategy whenever the ring is empty.
    /// Returns `Err` on the first invariant violation; the core is then
    /// halted and further runs fail immediately.
    pub fn run<H>(
        &mut self,
        handler: &mut H,
        cancel: &CancelToken,
    ) -> Result<RunReport, InvariantViolation>
    where
        H: EventHandler + ?Sized,
    {
        tracing::info!(
            wait_strategy = self.wait.name(),
            gap_policy = ?self.gaps.policy(),
            "Consumer loop started"
        );

        let start = Instant::now();
        let mut processed = 0u64;

        while !cancel.is_cancelled() {
            match self.poll_once(handler)? {
                Poll::Processed { .. } => {
                    processed += 1;
                    self.wait.reset();
                }
                Poll::Empty => self.wait.idle(),
            }
        }

        let abandoned = self.ring.pending() as u64;
        self.metrics.set_abandoned(abandoned);
        if abandoned > 0 {
            tracing::warn!(abandoned, "Consumer cancelled with unprocessed events");
        }

        let report = RunReport {
            processed,
            abandoned,
            last_sequence: self.gaps.last_sequence(),
            skipped: self.gaps.total_skipped(),
            latency: self.latency.summary(),
            elapsed: start.elapsed(),
        };
        tracing::info!(
            processed = report.processed,
            abandoned = report.abandoned,
            last_sequence = report.last_sequence,
            "Consumer loop stopped"
        );
        Ok(report)
    }

    /// Process at most one event without waiting
    #[inline]
    pub fn poll_once<H>(&mut self, handler: &mut H) -> Result<Poll, InvariantViolation>
    where
        H: EventHandler + ?Sized,
    {
        if let Some(violation) = self.halted {
            return Err(violation);
        }
        if let Some(kind) = self.metrics.violation() {
            return Err(adopt_halt(&mut self.halted, kind));
        }

        let index = match self.ring.consume() {
            Ok(index) => index,
            Err(ConsumeError::Empty) => return Ok(Poll::Empty),
            Err(ConsumeError::Corrupted(violation)) => {
                return Err(halt(&mut self.halted, &self.metrics, violation));
            }
        };

        let handle = match self.pool.reclaim(index) {
            Ok(handle) => handle,
            Err(violation) => return Err(halt(&mut self.halted, &self.metrics, violation)),
        };

        let record = match self.pool.record(&handle) {
            Ok(record) => record,
            Err(violation) => return Err(halt(&mut self.halted, &self.metrics, violation)),
        };
        let sequence = record.sequence;
        if let Err(violation) = self.gaps.check(sequence) {
            return Err(halt(&mut self.halted, &self.metrics, violation));
        }

        handler.on_event(record);
        let latency_ns = self.clock.now_ns().saturating_sub(record.publish_ts_ns);

        if let Err(violation) = self.pool.release(handle) {
            return Err(halt(&mut self.halted, &self.metrics, violation));
        }

        self.latency.record(latency_ns);
        self.metrics.record_processed(latency_ns);
        Ok(Poll::Processed { sequence })
    }

    /// Process everything currently visible, without waiting
    ///
    /// Returns the number of events processed. Used at orderly shutdown.
    pub fn drain<H>(&mut self, handler: &mut H) -> Result<u64, InvariantViolation>
    where
        H: EventHandler + ?Sized,
    {
        let mut processed = 0u64;
        while let Poll::Processed { .. } = self.poll_once(handler)? {
            processed += 1;
        }
        self.metrics.set_abandoned(0);
        tracing::debug!(processed, "Drained ring");
        Ok(processed)
    }

    /// Approximate number of events waiting in the ring
    #[inline]
    pub fn pending(&self) -> usize {
        self.ring.pending()
    }

    /// Latency histogram of every event processed so far
    pub fn latency(&self) -> &LatencyRecorder {
        &self.latency
    }

    pub fn last_sequence(&self) -> u64 {
        self.gaps.last_sequence()
    }

    /// The violation that halted this consumer, if any
    pub fn violation(&self) -> Option<InvariantViolation> {
        self.halted
    }
}

impl fmt::Debug for ConsumerLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerLoop")
            .field("ring", &self.ring)
            .field("last_sequence", &self.gaps.last_sequence())
            .field("wait", &self.wait.name())
            .field("halted", &self.halted)
            .finish()
    }
}

/// Flag the core as halted and remember the violation
#[cold]
fn halt(
    slot: &mut Option<InvariantViolation>,
    metrics: &CoreMetrics,
    violation: InvariantViolation,
) -> InvariantViolation {
    tracing::error!(%violation, "Consumer detected invariant violation, halting core");
    metrics.record_fatal(violation.kind());
    *slot = Some(violation);
    violation
}

/// Stop consuming because the producer already halted the core
#[cold]
fn adopt_halt(slot: &mut Option<InvariantViolation>, kind: ViolationKind) -> InvariantViolation {
    let violation = InvariantViolation::CoreHalted { kind };
    tracing::error!(?kind, "Core halted by producer, consumer stopping");
    *slot = Some(violation);
    violation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::engine::EventCore;
    use crate::testing::{order_fields, Collector};

    fn core(pool: usize, ring: usize) -> EventCore {
        EventCore::new(&CoreConfig {
            pool_capacity: pool,
            ring_capacity: ring,
            ..CoreConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_poll_once_empty() {
        let (_port, mut consumer, _observer) = core(4, 4).split();
        let mut collector = Collector::default();

        assert_eq!(consumer.poll_once(&mut collector), Ok(Poll::Empty));
        assert!(collector.is_empty());
    }

    #[test]
    fn test_poll_once_processes_in_order() {
        let (mut port, mut consumer, observer) = core(8, 8).split();
        let mut collector = Collector::default();

        for q in [10, 20, 30] {
            port.submit(&order_fields(q)).unwrap();
        }

        assert_eq!(
            consumer.poll_once(&mut collector),
            Ok(Poll::Processed { sequence: 1 })
        );
        assert_eq!(consumer.drain(&mut collector), Ok(2));
        assert_eq!(collector.quantities(), vec![10, 20, 30]);
        assert_eq!(collector.sequences(), vec![1, 2, 3]);

        let snapshot = observer.snapshot();
        assert_eq!(snapshot.processed, 3);
        assert_eq!(snapshot.pool_available, 8);
        assert_eq!(consumer.latency().len(), 3);
    }

    #[test]
    fn test_closure_handler() {
        let (mut port, mut consumer, _observer) = core(4, 4).split();
        port.submit(&order_fields(7)).unwrap();

        let mut total = 0u64;
        let mut handler = |record: &EventRecord| total += record.quantity;
        consumer.drain(&mut handler).unwrap();
        assert_eq!(total, 7);
    }

    #[test]
    fn test_run_returns_on_cancel() {
        let (mut port, mut consumer, observer) = core(4, 4).split();
        port.submit(&order_fields(1)).unwrap();
        port.submit(&order_fields(2)).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();

        let report = consumer.run(&mut Collector::default(), &cancel).unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.abandoned, 2);
        assert_eq!(observer.snapshot().abandoned, 2);

        // Draining afterwards clears the gauge
        assert_eq!(consumer.drain(&mut Collector::default()), Ok(2));
        assert_eq!(observer.snapshot().abandoned, 0);
    }

    #[test]
    fn test_corrupted_sequence_halts_core() {
        let (mut port, mut consumer, observer) = core(4, 4).split();
        port.submit(&order_fields(1)).unwrap();

        // Forge a duplicate of an already-processed sequence
        consumer.drain(&mut Collector::default()).unwrap();
        port.submit(&order_fields(2)).unwrap();
        consumer.gaps = GapDetector::new(crate::resilience::GapPolicy::Strict);
        consumer.gaps.check(1).unwrap();
        consumer.gaps.check(2).unwrap();

        let err = consumer.poll_once(&mut Collector::default()).unwrap_err();
        assert!(matches!(
            err,
            InvariantViolation::SequenceRegression { last: 2, actual: 2 }
        ));
        assert_eq!(observer.snapshot().violation, Some(ViolationKind::SequenceRegression));

        // Sticky: the consumer refuses to continue, the producer is rejected
        assert_eq!(consumer.poll_once(&mut Collector::default()), Err(err));
        assert_eq!(port.submit(&order_fields(3)), Err(crate::core::Rejected::Halted));
    }

    #[test]
    fn test_producer_halt_stops_consumer() {
        let (mut port, mut consumer, observer) = core(4, 4).split();
        port.submit(&order_fields(1)).unwrap();

        // Violation found on the producer side
        consumer.metrics.record_fatal(ViolationKind::DoubleRelease);
        assert!(observer.is_halted());

        let mut collector = Collector::default();
        let expected = InvariantViolation::CoreHalted {
            kind: ViolationKind::DoubleRelease,
        };
        assert_eq!(consumer.poll_once(&mut collector), Err(expected));
        assert!(collector.is_empty());
        assert_eq!(consumer.violation(), Some(expected));

        let cancel = CancelToken::new();
        assert_eq!(consumer.run(&mut collector, &cancel).unwrap_err(), expected);
        assert!(collector.is_empty());
        assert_eq!(observer.snapshot().processed, 0);
    }
}
