//! Lock-Free Event Pool
//!
//! Pre-allocated `EventRecord` slots handed out by integer index. Free slots
//! form a Treiber stack threaded through a flat `next` array (no pointers, no
//! per-node allocation). The stack head packs `(tag, index)` into one
//! `AtomicU64`; the tag is bumped on every successful push and pop so a stale
//! compare-and-exchange can never succeed against a recycled index (ABA).
//!
//! ```text
//!   head: [tag:32 | index:32]
//!            │
//!            ▼
//!   next:  [ 3 ][NIL][ 0 ][ 1 ] ...     state: [F][F][I][F] ...
//!   records: 64-byte aligned slots, one cache line each
//! ```

use crate::config::constants::MAX_CAPACITY;
use crate::core::{ConfigError, EventRecord, InvariantViolation, PoolExhausted};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Sentinel index marking the end of the free list
pub const NIL: u32 = u32::MAX;

const FREE: u8 = 0;
const IN_FLIGHT: u8 = 1;

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

#[inline(always)]
fn pack(index: u32, tag: u32) -> u64 {
    ((tag as u64) << 32) | index as u64
}

#[inline(always)]
fn unpack(word: u64) -> (u32, u32) {
    (word as u32, (word >> 32) as u32)
}

/// Exclusive ownership of one IN-FLIGHT slot
///
/// Not `Clone`/`Copy`: whoever holds the handle is the only party allowed to
/// touch the slot, and releasing consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct SlotHandle {
    index: u32,
    pool: u32,
}

impl SlotHandle {
    /// Slot index inside the pool
    #[inline(always)]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Give up the handle, keeping only the index (for transport through the ring)
    #[inline(always)]
    pub(crate) fn into_index(self) -> u32 {
        self.index
    }
}

/// Fixed-capacity pool of event records
///
/// Safe to share between the producer and consumer threads. `acquire` and
/// `release` never block and never allocate.
pub struct EventPool {
    /// Free-list head: `(tag, index)`
    head: CachePadded<AtomicU64>,

    id: u32,
    capacity: u32,

    records: Box<[UnsafeCell<EventRecord>]>,
    next: Box<[AtomicU32]>,
    state: Box<[AtomicU8]>,
}

// Records are only reached through a uniquely owned `SlotHandle`, and
// ownership moves between threads with acquire/release ordering on the
// free-list head or the ring cursors.
unsafe impl Sync for EventPool {}

impl EventPool {
    /// Create a pool with `capacity` slots (power of two)
    ///
    /// All records are allocated here, once. Nothing is allocated afterwards.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        validate_capacity("pool_capacity", capacity)?;

        let records = (0..capacity)
            .map(|_| UnsafeCell::new(EventRecord::empty()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        // Thread the free list through all slots: 0 -> 1 -> ... -> NIL
        let next = (0..capacity)
            .map(|i| {
                let link = if i + 1 < capacity { (i + 1) as u32 } else { NIL };
                AtomicU32::new(link)
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let state = (0..capacity)
            .map(|_| AtomicU8::new(FREE))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Created event pool {} with {} slots", id, capacity);

        Ok(Self {
            head: CachePadded::new(AtomicU64::new(pack(0, 0))),
            id,
            capacity: capacity as u32,
            records,
            next,
            state,
        })
    }

    /// Acquire a FREE slot and mark it IN-FLIGHT
    ///
    /// Returns `PoolExhausted` immediately when nothing is free.
    #[inline]
    pub fn acquire(&self) -> Result<SlotHandle, PoolExhausted> {
        let mut current = self.head.load(Ordering::Acquire);
        loop {
            let (index, tag) = unpack(current);
            if index == NIL {
                return Err(PoolExhausted);
            }

            // May be stale if another thread popped `index` meanwhile; the tag
            // makes the CAS below fail in that case.
            let next = self.next[index as usize].load(Ordering::Relaxed);

            match self.head.compare_exchange_weak(
                current,
                pack(next, tag.wrapping_add(1)),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.state[index as usize].store(IN_FLIGHT, Ordering::Relaxed);
                    return Ok(SlotHandle {
                        index,
                        pool: self.id,
                    });
                }
                Err(actual) => {
                    current = actual;
                    std::hint::spin_loop();
                }
            }
        }
    }

    /// Return a slot to the pool
    ///
    /// The handle is consumed. A handle from another pool, or a slot that is
    /// already FREE, is an invariant violation.
    #[inline]
    pub fn release(&self, handle: SlotHandle) -> Result<(), InvariantViolation> {
        self.check_owner(&handle)?;
        let index = handle.index;

        self.state[index as usize]
            .compare_exchange(IN_FLIGHT, FREE, Ordering::AcqRel, Ordering::Relaxed)
            .map_err(|_| InvariantViolation::DoubleRelease { index })?;

        self.push(index);
        Ok(())
    }

    #[inline(always)]
    fn push(&self, index: u32) {
        let mut current = self.head.load(Ordering::Relaxed);
        loop {
            let (head_index, tag) = unpack(current);
            self.next[index as usize].store(head_index, Ordering::Relaxed);

            match self.head.compare_exchange_weak(
                current,
                pack(index, tag.wrapping_add(1)),
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => {
                    current = actual;
                    std::hint::spin_loop();
                }
            }
        }
    }

    /// Rebuild the handle for an index received through the ring
    ///
    /// Only for indices the caller took off the ring: dequeued by the consumer
    /// or evicted by the producer in overwrite mode.
    #[inline]
    pub(crate) fn reclaim(&self, index: u32) -> Result<SlotHandle, InvariantViolation> {
        if index >= self.capacity {
            return Err(InvariantViolation::SlotOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        if self.state[index as usize].load(Ordering::Acquire) != IN_FLIGHT {
            return Err(InvariantViolation::SlotNotInFlight { index });
        }
        Ok(SlotHandle {
            index,
            pool: self.id,
        })
    }

    /// Read access to the slot owned by `handle`
    #[inline(always)]
    pub fn record<'a>(
        &'a self,
        handle: &'a SlotHandle,
    ) -> Result<&'a EventRecord, InvariantViolation> {
        self.check_owner(handle)?;
        // SAFETY: the handle is the unique owner of this slot.
        Ok(unsafe { &*self.records[handle.index as usize].get() })
    }

    /// Write access to the slot owned by `handle`
    #[inline(always)]
    pub fn record_mut<'a>(
        &'a self,
        handle: &'a mut SlotHandle,
    ) -> Result<&'a mut EventRecord, InvariantViolation> {
        self.check_owner(handle)?;
        // SAFETY: the handle is the unique owner of this slot and is mutably
        // borrowed for as long as the reference lives.
        Ok(unsafe { &mut *self.records[handle.index as usize].get() })
    }

    fn check_owner(&self, handle: &SlotHandle) -> Result<(), InvariantViolation> {
        if handle.pool != self.id {
            return Err(InvariantViolation::ForeignHandle {
                index: handle.index,
                handle_pool: handle.pool,
                pool: self.id,
            });
        }
        Ok(())
    }

    /// Total number of slots (fixed at construction)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Approximate number of FREE slots (observability only, O(capacity))
    pub fn available(&self) -> usize {
        self.state
            .iter()
            .filter(|s| s.load(Ordering::Relaxed) == FREE)
            .count()
    }

    /// Pool identifier, unique per process
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Pre-fault all record pages (warm-up routine)
    ///
    /// Must run before the pool is shared.
    pub fn warm_up(&mut self) {
        for cell in self.records.iter_mut() {
            // Volatile write so the touch is not optimized out
            unsafe {
                std::ptr::write_volatile(cell.get_mut(), EventRecord::empty());
            }
        }
    }
}

impl fmt::Debug for EventPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, tag) = unpack(self.head.load(Ordering::Relaxed));
        f.debug_struct("EventPool")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("head", &head)
            .field("tag", &tag)
            .finish()
    }
}

/// Shared capacity check for the pool and the ring
pub(crate) fn validate_capacity(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroCapacity { name });
    }
    if !value.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { name, value });
    }
    if value > MAX_CAPACITY {
        return Err(ConfigError::CapacityTooLarge {
            name,
            value,
            max: MAX_CAPACITY,
        });
    }
    Ok(())
}
