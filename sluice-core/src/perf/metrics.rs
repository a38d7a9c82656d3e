//! Lock-Free Core Metrics
//!
//! Cache-aligned atomic counters, grouped by the thread that mutates them so
//! producer and consumer never write to the same cache line. All counters use
//! relaxed ordering: they are observability, never correctness.

use crate::core::{Rejected, ViolationKind};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Counters written only by the producer thread
#[repr(C, align(64))]
#[derive(Debug, Default)]
struct ProducerCounters {
    submitted: AtomicU64,
    rejected_pool_exhausted: AtomicU64,
    rejected_buffer_full: AtomicU64,
    rejected_halted: AtomicU64,
    /// Entries evicted by overwrite-on-full
    dropped: AtomicU64,
}

/// Counters written only by the consumer thread
#[repr(C, align(64))]
#[derive(Debug, Default)]
struct ConsumerCounters {
    processed: AtomicU64,
    /// Entries left in the ring when the consumer last stopped on cancellation
    abandoned: AtomicU64,
    total_latency_ns: AtomicU64,
    max_latency_ns: AtomicU64,
}

/// Written once, when the core halts
#[repr(C, align(64))]
#[derive(Debug, Default)]
struct HaltState {
    violation: AtomicU8,
}

/// Cache-aligned metrics shared by producer, consumer and observers
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct CoreMetrics {
    producer: ProducerCounters,
    consumer: ConsumerCounters,
    halt: HaltState,
}

impl CoreMetrics {
    /// Create new metrics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // ===== producer side =====

    #[inline(always)]
    pub fn inc_submitted(&self) {
        self.producer.submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_rejected(&self, reason: Rejected) {
        let counter = match reason {
            Rejected::PoolExhausted => &self.producer.rejected_pool_exhausted,
            Rejected::BufferFull => &self.producer.rejected_buffer_full,
            Rejected::Halted => &self.producer.rejected_halted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_dropped(&self) {
        self.producer.dropped.fetch_add(1, Ordering::Relaxed);
    }

    // ===== consumer side =====

    /// Count one processed event and its publish -> processed latency
    #[inline(always)]
    pub fn record_processed(&self, latency_ns: u64) {
        let c = &self.consumer;
        c.processed.fetch_add(1, Ordering::Relaxed);
        c.total_latency_ns.fetch_add(latency_ns, Ordering::Relaxed);
        // Single writer: load + store is enough for a max
        if latency_ns > c.max_latency_ns.load(Ordering::Relaxed) {
            c.max_latency_ns.store(latency_ns, Ordering::Relaxed);
        }
    }

    /// Gauge, not a counter: entries still stranded in the ring right now
    pub fn set_abandoned(&self, count: u64) {
        self.consumer.abandoned.store(count, Ordering::Relaxed);
    }

    // ===== halt flag =====

    /// Record the first invariant violation; later ones are ignored
    pub fn record_fatal(&self, kind: ViolationKind) {
        let _ = self.halt.violation.compare_exchange(
            0,
            kind as u8,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }

    /// Whether the core stopped on an invariant violation
    #[inline(always)]
    pub fn is_halted(&self) -> bool {
        self.halt.violation.load(Ordering::Acquire) != 0
    }

    pub fn violation(&self) -> Option<ViolationKind> {
        ViolationKind::from_code(self.halt.violation.load(Ordering::Acquire))
    }

    /// Get snapshot of all counters
    ///
    /// Occupancy and pool availability are not known here; `CoreObserver`
    /// fills them in.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let p = &self.producer;
        let c = &self.consumer;
        MetricsSnapshot {
            submitted: p.submitted.load(Ordering::Relaxed),
            rejected_pool_exhausted: p.rejected_pool_exhausted.load(Ordering::Relaxed),
            rejected_buffer_full: p.rejected_buffer_full.load(Ordering::Relaxed),
            rejected_halted: p.rejected_halted.load(Ordering::Relaxed),
            dropped: p.dropped.load(Ordering::Relaxed),
            processed: c.processed.load(Ordering::Relaxed),
            abandoned: c.abandoned.load(Ordering::Relaxed),
            total_latency_ns: c.total_latency_ns.load(Ordering::Relaxed),
            max_latency_ns: c.max_latency_ns.load(Ordering::Relaxed),
            occupancy: 0,
            pool_available: 0,
            violation: self.violation(),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub rejected_pool_exhausted: u64,
    pub rejected_buffer_full: u64,
    pub rejected_halted: u64,
    pub dropped: u64,
    pub processed: u64,
    pub abandoned: u64,
    pub total_latency_ns: u64,
    pub max_latency_ns: u64,
    /// Approximate ring occupancy
    pub occupancy: usize,
    /// Approximate FREE pool slots
    pub pool_available: usize,
    /// Set once the core halted
    pub violation: Option<ViolationKind>,
}

impl MetricsSnapshot {
    /// Rejections of every reason
    pub fn rejected_total(&self) -> u64 {
        self.rejected_pool_exhausted + self.rejected_buffer_full + self.rejected_halted
    }

    /// Submitted events not yet accounted for as processed, dropped or abandoned
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.processed + self.dropped + self.abandoned)
    }

    /// Average publish -> processed latency
    pub fn avg_latency_ns(&self) -> f64 {
        if self.processed > 0 {
            self.total_latency_ns as f64 / self.processed as f64
        } else {
            0.0
        }
    }

    /// Fraction of submit attempts that were rejected
    pub fn reject_rate(&self) -> f64 {
        let attempts = self.submitted + self.rejected_total();
        if attempts > 0 {
            self.rejected_total() as f64 / attempts as f64
        } else {
            0.0
        }
    }

    pub fn is_halted(&self) -> bool {
        self.violation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of};

    #[test]
    fn test_metrics_alignment() {
        assert_eq!(align_of::<CoreMetrics>(), 64);

        // Producer and consumer counters live on different cache lines
        let producer = offset_of!(CoreMetrics, producer);
        let consumer = offset_of!(CoreMetrics, consumer);
        let halt = offset_of!(CoreMetrics, halt);
        assert!(consumer - producer >= 64);
        assert!(halt - consumer >= 64);
        assert_eq!(consumer % 64, 0);
    }

    #[test]
    fn test_metrics_operations() {
        let metrics = CoreMetrics::new();

        metrics.inc_submitted();
        metrics.inc_submitted();
        metrics.inc_rejected(Rejected::PoolExhausted);
        metrics.inc_rejected(Rejected::BufferFull);
        metrics.inc_rejected(Rejected::BufferFull);
        metrics.inc_dropped();
        metrics.record_processed(100);
        metrics.record_processed(300);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.submitted, 2);
        assert_eq!(snapshot.rejected_pool_exhausted, 1);
        assert_eq!(snapshot.rejected_buffer_full, 2);
        assert_eq!(snapshot.rejected_total(), 3);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.max_latency_ns, 300);
        assert_eq!(snapshot.avg_latency_ns(), 200.0);
        assert!(!snapshot.is_halted());
    }

    #[test]
    fn test_snapshot_calculations() {
        let snapshot = MetricsSnapshot {
            submitted: 10,
            rejected_pool_exhausted: 5,
            rejected_buffer_full: 5,
            rejected_halted: 0,
            dropped: 1,
            processed: 6,
            abandoned: 2,
            total_latency_ns: 600,
            max_latency_ns: 200,
            occupancy: 0,
            pool_available: 0,
            violation: None,
        };

        assert_eq!(snapshot.in_flight(), 1);
        assert_eq!(snapshot.reject_rate(), 0.5);
        assert_eq!(snapshot.avg_latency_ns(), 100.0);
    }

    #[test]
    fn test_first_violation_wins() {
        let metrics = CoreMetrics::new();
        assert!(!metrics.is_halted());

        metrics.record_fatal(ViolationKind::SequenceGap);
        metrics.record_fatal(ViolationKind::DoubleRelease);

        assert!(metrics.is_halted());
        assert_eq!(metrics.violation(), Some(ViolationKind::SequenceGap));
        assert_eq!(metrics.snapshot().violation, Some(ViolationKind::SequenceGap));
    }
}
