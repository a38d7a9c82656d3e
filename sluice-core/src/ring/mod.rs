//! SPSC Ring Buffer of slot indices
//!
//! Fixed power-of-two capacity, two monotonically increasing `u64` cursors on
//! separate cache lines. `RingBuffer::new` returns the two halves; each half is
//! the only writer of its own cursor and caches the other side's cursor so the
//! remote cache line is only touched when the cached view runs out.
//!
//! ```text
//!   write ──────────────┐           read ─────┐
//!   [CachePadded u64]   │           [CachePadded u64]
//!                       ▼                     ▼
//!   slots: [ i ][ i ][ i ][   ][   ][ i ][ i ][ i ]   index = cursor & mask
//! ```
//!
//! Reject-on-full (default): publish fails with `Full` when
//! `write - read == capacity`. No compare-and-exchange on either cursor.
//!
//! Overwrite-on-full: the producer evicts the oldest unread entry by CAS on the
//! read cursor and hands the evicted index back to the caller. In this mode the
//! consumer also advances the read cursor by CAS and retries when it loses.
//! Slots are `AtomicU32`, so a racing read of an evicted entry is harmless: it
//! is discarded when the consumer's CAS fails.

use crate::core::{ConfigError, ConsumeError, InvariantViolation, PublishError};
use crate::pool::validate_capacity;
use crossbeam_utils::CachePadded;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared ring state
pub struct RingBuffer {
    /// Next cursor the producer will write (producer-owned)
    write: CachePadded<AtomicU64>,

    /// Next cursor the consumer will read (consumer-owned, except overwrite mode)
    read: CachePadded<AtomicU64>,

    slots: Box<[AtomicU32]>,
    mask: u64,
    capacity: u64,
    overwrite: bool,
}

/// Outcome of a successful publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// Stored in a free position
    Stored,
    /// Buffer was full; the oldest unread value was evicted (overwrite mode)
    Overwrote(u32),
}

impl RingBuffer {
    /// Create a ring with `capacity` positions (power of two)
    ///
    /// Returns the producer and consumer halves. Neither is `Clone`, so
    /// there is exactly one of each.
    pub fn new(
        capacity: usize,
        overwrite_on_full: bool,
    ) -> Result<(RingProducer, RingConsumer), ConfigError> {
        validate_capacity("ring_capacity", capacity)?;

        let slots = (0..capacity)
            .map(|_| AtomicU32::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let ring = Arc::new(Self {
            write: CachePadded::new(AtomicU64::new(0)),
            read: CachePadded::new(AtomicU64::new(0)),
            slots,
            mask: capacity as u64 - 1,
            capacity: capacity as u64,
            overwrite: overwrite_on_full,
        });

        let producer = RingProducer {
            ring: Arc::clone(&ring),
            write: 0,
            cached_read: 0,
        };
        let consumer = RingConsumer {
            ring,
            read: 0,
            cached_write: 0,
        };
        Ok((producer, consumer))
    }

    /// Fixed capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Approximate number of unread entries
    ///
    /// May be stale under concurrent access; observability only.
    #[inline]
    pub fn size(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.saturating_sub(read).min(self.capacity) as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size()
    }

    /// Approximate emptiness (same caveats as `size`)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Whether a full buffer evicts its oldest entry instead of rejecting
    #[inline]
    pub fn overwrites_on_full(&self) -> bool {
        self.overwrite
    }

    /// Current `(write, read)` cursors, for diagnostics
    pub fn cursors(&self) -> (u64, u64) {
        (
            self.write.load(Ordering::Acquire),
            self.read.load(Ordering::Acquire),
        )
    }

    #[inline(always)]
    fn slot(&self, cursor: u64) -> &AtomicU32 {
        &self.slots[(cursor & self.mask) as usize]
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (write, read) = self.cursors();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("write", &write)
            .field("read", &read)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

/// Producer half. Only this half advances the write cursor.
pub struct RingProducer {
    ring: Arc<RingBuffer>,
    write: u64,
    cached_read: u64,
}

impl RingProducer {
    /// Publish one value
    ///
    /// The value is stored before the write cursor is advanced with release
    /// ordering, so the consumer never sees the cursor without the value.
    #[inline]
    pub fn publish(&mut self, value: u32) -> Result<Published, PublishError> {
        let ring = &*self.ring;

        if self.write - self.cached_read >= ring.capacity {
            self.cached_read = ring.read.load(Ordering::Acquire);
            if self.write - self.cached_read >= ring.capacity {
                if !ring.overwrite {
                    return Err(PublishError::Full);
                }
                return Ok(self.publish_overwriting(value));
            }
        }

        self.store(value);
        Ok(Published::Stored)
    }

    #[inline(always)]
    fn store(&mut self, value: u32) {
        let ring = &*self.ring;
        ring.slot(self.write).store(value, Ordering::Relaxed);
        self.write += 1;
        ring.write.store(self.write, Ordering::Release);
    }

    #[cold]
    fn publish_overwriting(&mut self, value: u32) -> Published {
        let ring = &*self.ring;
        loop {
            let read = self.cached_read;
            // Full: the oldest entry sits in the position we are about to write
            let evicted = ring.slot(read).load(Ordering::Relaxed);

            match ring
                .read
                .compare_exchange(read, read + 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.cached_read = read + 1;
                    self.store(value);
                    return Published::Overwrote(evicted);
                }
                Err(actual) => {
                    // The consumer took it first
                    self.cached_read = actual;
                    if self.write - actual < ring.capacity {
                        self.store(value);
                        return Published::Stored;
                    }
                }
            }
        }
    }

    /// Claim the oldest unread value without publishing (overwrite mode)
    ///
    /// Lets the producer recycle a slot when the pool is exhausted. Returns
    /// `None` when the ring is empty or overwrite is disabled.
    #[cold]
    pub fn evict_oldest(&mut self) -> Option<u32> {
        let ring = &*self.ring;
        if !ring.overwrite {
            return None;
        }

        let mut read = ring.read.load(Ordering::Acquire);
        loop {
            if read == self.write {
                self.cached_read = read;
                return None;
            }
            let evicted = ring.slot(read).load(Ordering::Relaxed);
            match ring
                .read
                .compare_exchange(read, read + 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.cached_read = read + 1;
                    return Some(evicted);
                }
                Err(actual) => read = actual,
            }
        }
    }

    /// Shared ring, for occupancy observation
    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    /// Number of values this producer has published
    #[inline]
    pub fn published(&self) -> u64 {
        self.write
    }
}

impl fmt::Debug for RingProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingProducer")
            .field("write", &self.write)
            .field("cached_read", &self.cached_read)
            .finish()
    }
}

/// Consumer half. Only this half advances the read cursor (reject mode).
pub struct RingConsumer {
    ring: Arc<RingBuffer>,
    read: u64,
    cached_write: u64,
}

impl RingConsumer {
    /// Take the oldest published value
    ///
    /// Acquire-loads the write cursor so the value stored before it is
    /// visible, then advances the read cursor with release ordering.
    #[inline]
    pub fn consume(&mut self) -> Result<u32, ConsumeError> {
        if self.ring.overwrite {
            return self.consume_contended();
        }

        let ring = &*self.ring;
        if self.read == self.cached_write {
            self.cached_write = ring.write.load(Ordering::Acquire);
            if self.read == self.cached_write {
                return Err(ConsumeError::Empty);
            }
            if self.cached_write.wrapping_sub(self.read) > ring.capacity {
                return Err(InvariantViolation::CursorOverrun {
                    write: self.cached_write,
                    read: self.read,
                    capacity: ring.capacity,
                }
                .into());
            }
        }

        let value = ring.slot(self.read).load(Ordering::Relaxed);
        self.read += 1;
        ring.read.store(self.read, Ordering::Release);
        Ok(value)
    }

    /// Overwrite mode: the producer may advance `read` too
    #[cold]
    fn consume_contended(&mut self) -> Result<u32, ConsumeError> {
        let ring = &*self.ring;
        loop {
            let read = ring.read.load(Ordering::Acquire);
            let write = ring.write.load(Ordering::Acquire);
            if read == write {
                return Err(ConsumeError::Empty);
            }
            if write.wrapping_sub(read) > ring.capacity {
                // Either the producer evicted since we loaded `read`, or the
                // cursors are genuinely broken
                if ring.read.load(Ordering::Acquire) == read {
                    return Err(InvariantViolation::CursorOverrun {
                        write,
                        read,
                        capacity: ring.capacity,
                    }
                    .into());
                }
                continue;
            }

            let value = ring.slot(read).load(Ordering::Relaxed);
            if ring
                .read
                .compare_exchange(read, read + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                self.read = read + 1;
                return Ok(value);
            }
            std::hint::spin_loop();
        }
    }

    /// Entries currently visible to this consumer (approximate)
    #[inline]
    pub fn pending(&self) -> usize {
        self.ring.size()
    }

    /// Shared ring, for occupancy observation
    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }
}

impl fmt::Debug for RingConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingConsumer")
            .field("read", &self.read)
            .field("cached_write", &self.cached_write)
            .finish()
    }
}
