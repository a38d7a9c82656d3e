//! Producer side: acquire, fill, publish

use crate::core::{CoreClock, EventFields, InvariantViolation, PublishError, Rejected};
use crate::perf::CoreMetrics;
use crate::pool::{EventPool, SlotHandle};
use crate::ring::{Published, RingProducer};
use std::fmt;
use std::sync::Arc;

/// Producer-side handle of the core
///
/// `Send` but not `Clone`: exactly one thread submits events.
pub struct IngestionPort {
    pool: Arc<EventPool>,
    ring: RingProducer,
    metrics: Arc<CoreMetrics>,
    clock: CoreClock,
    /// Sequence assigned to the next successful submit
    next_sequence: u64,
    overwrite: bool,
}

impl IngestionPort {
    pub(crate) fn new(
        pool: Arc<EventPool>,
        ring: RingProducer,
        metrics: Arc<CoreMetrics>,
        clock: CoreClock,
    ) -> Self {
        let overwrite = ring.ring().overwrites_on_full();
        Self {
            pool,
            ring,
            metrics,
            clock,
            next_sequence: 1,
            overwrite,
        }
    }

    /// Copy `fields` into a pooled record and publish it
    ///
    /// Returns the assigned sequence number. Never blocks and never
    /// allocates. A rejected submit consumes no sequence number.
    ///
    /// With overwrite-on-full an exhausted pool does not reject: the oldest
    /// unread event is evicted from the ring and its slot reused.
    #[inline]
    pub fn submit(&mut self, fields: &EventFields) -> Result<u64, Rejected> {
        if self.metrics.is_halted() {
            return Err(self.reject(Rejected::Halted));
        }

        let mut handle = match self.pool.acquire() {
            Ok(handle) => handle,
            Err(_) if self.overwrite => self.recycle_oldest()?,
            Err(_) => return Err(self.reject(Rejected::PoolExhausted)),
        };

        let sequence = self.next_sequence;
        match self.pool.record_mut(&mut handle) {
            Ok(record) => record.fill(sequence, fields, self.clock.now_ns()),
            Err(violation) => {
                self.halt(violation);
                return Err(self.reject(Rejected::Halted));
            }
        }

        match self.ring.publish(handle.index()) {
            Ok(published) => {
                // Ownership now travels with the index through the ring
                let _ = handle.into_index();
                self.next_sequence += 1;
                self.metrics.inc_submitted();
                if let Published::Overwrote(evicted) = published {
                    self.release_evicted(evicted);
                }
                Ok(sequence)
            }
            Err(PublishError::Full) => {
                if let Err(violation) = self.pool.release(handle) {
                    self.halt(violation);
                    return Err(self.reject(Rejected::Halted));
                }
                Err(self.reject(Rejected::BufferFull))
            }
        }
    }

    /// Sequence the next successful submit will receive
    #[inline]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Whether the consumer halted on an invariant violation
    #[inline]
    pub fn is_halted(&self) -> bool {
        self.metrics.is_halted()
    }

    #[inline(always)]
    fn reject(&self, reason: Rejected) -> Rejected {
        self.metrics.inc_rejected(reason);
        reason
    }

    /// Slot for an overwrite-mode submit that found the pool empty
    ///
    /// With nothing left in the ring the consumer holds every slot, which is
    /// reported as `PoolExhausted`.
    #[cold]
    fn recycle_oldest(&mut self) -> Result<SlotHandle, Rejected> {
        let Some(index) = self.ring.evict_oldest() else {
            // The consumer may have released one meanwhile
            return self
                .pool
                .acquire()
                .map_err(|_| self.reject(Rejected::PoolExhausted));
        };

        match self.pool.reclaim(index) {
            Ok(handle) => {
                self.metrics.inc_dropped();
                Ok(handle)
            }
            Err(violation) => {
                self.halt(violation);
                Err(self.reject(Rejected::Halted))
            }
        }
    }

    /// Return a slot evicted by overwrite-on-full to the pool
    #[cold]
    fn release_evicted(&self, index: u32) {
        let released = self
            .pool
            .reclaim(index)
            .and_then(|handle| self.pool.release(handle));

        match released {
            Ok(()) => self.metrics.inc_dropped(),
            Err(violation) => self.halt(violation),
        }
    }

    #[cold]
    fn halt(&self, violation: InvariantViolation) {
        tracing::error!(%violation, "Producer detected invariant violation, halting core");
        self.metrics.record_fatal(violation.kind());
    }
}

impl fmt::Debug for IngestionPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionPort")
            .field("next_sequence", &self.next_sequence)
            .field("ring", &self.ring)
            .finish()
    }
}
