//! Core zero-overhead types for the hand-off core
//!
//! - `EventRecord`: 64-byte cache-line aligned market event
//! - `EventFields`: caller payload handed to the ingestion port
//! - Error taxonomy (backpressure, invariant violations, configuration)
//! - Fixed-point price helpers

pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{
    ConfigError, ConsumeError, ConversionError, InvariantViolation, PoolExhausted, PublishError,
    Rejected, ViolationKind,
};
pub use types::{fixed_point, CoreClock, EventFields, EventKind, EventRecord, Side, CACHE_LINE};
