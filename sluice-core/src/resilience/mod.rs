//! Consumer-side integrity checks
//!
//! Detects broken hand-off invariants before a corrupted event reaches the
//! processing collaborator.

pub mod gap_detector;

pub use gap_detector::{GapDetector, GapPolicy};
