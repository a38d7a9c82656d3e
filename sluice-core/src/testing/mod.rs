//! Testing utilities for unit and integration tests
//!
//! Provides:
//! - Event field builders
//! - `Collector`: an event handler that records what it sees

pub mod helpers;

pub use helpers::*;
