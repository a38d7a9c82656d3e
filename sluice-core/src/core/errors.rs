//! Domain-specific error types for the hand-off core
//!
//! Three families, handled very differently:
//! - Backpressure (`PoolExhausted`, `PublishError`, `Rejected`): expected under
//!   load, returned to the immediate caller.
//! - `InvariantViolation`: programming error or memory corruption. The consumer
//!   halts and the core is flagged as halted in metrics.
//! - `ConfigError`: rejected at construction, before any event flows.

use thiserror::Error;

/// No FREE slot is left in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event pool exhausted")]
pub struct PoolExhausted;

/// Ring buffer publish failure (reject-on-full mode only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("ring buffer full")]
    Full,
}

/// Ring buffer consume failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConsumeError {
    /// Nothing published since the last consume
    #[error("ring buffer empty")]
    Empty,

    /// Cursor bookkeeping is broken
    #[error(transparent)]
    Corrupted(#[from] InvariantViolation),
}

/// Why `IngestionPort::submit` refused an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u8)]
pub enum Rejected {
    #[error("rejected: event pool exhausted")]
    PoolExhausted = 0,

    #[error("rejected: ring buffer full")]
    BufferFull = 1,

    /// The consumer stopped on an invariant violation; nothing will drain
    #[error("rejected: core halted after invariant violation")]
    Halted = 2,
}

/// Broken core invariants. Always fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A slot was released while already FREE
    #[error("slot {index} released twice")]
    DoubleRelease { index: u32 },

    /// A handle minted by another pool was passed in
    #[error("handle for slot {index} belongs to pool {handle_pool}, not pool {pool}")]
    ForeignHandle {
        index: u32,
        handle_pool: u32,
        pool: u32,
    },

    /// The ring delivered an index outside the pool
    #[error("slot index {index} out of range (capacity {capacity})")]
    SlotOutOfRange { index: u32, capacity: u32 },

    /// The ring delivered a slot the pool considers FREE
    #[error("slot {index} consumed while not in flight")]
    SlotNotInFlight { index: u32 },

    /// Sequence jumped forward in reject-on-full mode
    #[error("sequence gap: expected {expected}, got {actual}")]
    SequenceGap { expected: u64, actual: u64 },

    /// Sequence repeated or went backwards
    #[error("sequence regression: last {last}, got {actual}")]
    SequenceRegression { last: u64, actual: u64 },

    /// write - read exceeded the ring capacity
    #[error("cursor overrun: write {write} - read {read} > capacity {capacity}")]
    CursorOverrun { write: u64, read: u64, capacity: u64 },

    /// The other half of the core already halted on `kind`
    #[error("core halted after {kind:?} detected by the other side")]
    CoreHalted { kind: ViolationKind },
}

impl InvariantViolation {
    /// Compact code stored in metrics so observers can see why the core halted
    pub fn kind(&self) -> ViolationKind {
        match self {
            InvariantViolation::DoubleRelease { .. } => ViolationKind::DoubleRelease,
            InvariantViolation::ForeignHandle { .. } => ViolationKind::ForeignHandle,
            InvariantViolation::SlotOutOfRange { .. } => ViolationKind::SlotOutOfRange,
            InvariantViolation::SlotNotInFlight { .. } => ViolationKind::SlotNotInFlight,
            InvariantViolation::SequenceGap { .. } => ViolationKind::SequenceGap,
            InvariantViolation::SequenceRegression { .. } => ViolationKind::SequenceRegression,
            InvariantViolation::CursorOverrun { .. } => ViolationKind::CursorOverrun,
            InvariantViolation::CoreHalted { kind } => *kind,
        }
    }
}

/// Discriminant of [`InvariantViolation`], storable in an `AtomicU8`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ViolationKind {
    DoubleRelease = 1,
    ForeignHandle = 2,
    SlotOutOfRange = 3,
    SlotNotInFlight = 4,
    SequenceGap = 5,
    SequenceRegression = 6,
    CursorOverrun = 7,
}

impl ViolationKind {
    /// Decode from the metrics byte (0 = none)
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ViolationKind::DoubleRelease),
            2 => Some(ViolationKind::ForeignHandle),
            3 => Some(ViolationKind::SlotOutOfRange),
            4 => Some(ViolationKind::SlotNotInFlight),
            5 => Some(ViolationKind::SequenceGap),
            6 => Some(ViolationKind::SequenceRegression),
            7 => Some(ViolationKind::CursorOverrun),
            _ => None,
        }
    }
}

/// Configuration rejected at construction time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be non-zero")]
    ZeroCapacity { name: &'static str },

    #[error("{name} must be a power of two, got {value}")]
    NotPowerOfTwo { name: &'static str, value: usize },

    #[error("{name} = {value} exceeds maximum {max}")]
    CapacityTooLarge {
        name: &'static str,
        value: usize,
        max: usize,
    },

    #[error("invalid wait strategy: {reason}")]
    InvalidWaitStrategy { reason: String },

    #[error("latency_max_ns must be at least 2, got {value}")]
    InvalidLatencyBound { value: u64 },

    #[error("invalid log level '{level}'")]
    InvalidLogLevel { level: String },
}

/// Errors that can occur during fixed-point conversions
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConversionError {
    #[error("value {value} is out of range for fixed-point representation")]
    OutOfRange { value: f64 },

    #[error("cannot convert NaN to fixed-point")]
    NotANumber,

    #[error("cannot convert infinity to fixed-point (positive: {positive})")]
    Infinite { positive: bool },
}
