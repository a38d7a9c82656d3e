//! Sluice Core - Lock-Free Market-Event Hand-off
//!
//! Moves decoded market events from one ingestion thread to one processing
//! thread without locks, without heap allocation after startup and without
//! false sharing.
//!
//! ## Architecture
//! - **Pre-allocated** event records (64 bytes, cache-line aligned)
//! - **Lock-free** Treiber-stack pool with generation-tagged head (ABA-safe)
//! - **SPSC ring** of slot indices with cached remote cursors
//! - **Backpressure** by rejection (default) or overwrite-oldest
//!
//! ## Core Modules
//! - `core`: Event types, fixed-point prices, error taxonomy
//! - `pool`: Fixed-capacity event record pool
//! - `ring`: SPSC ring buffer of slot indices
//! - `engine`: `IngestionPort`, `ConsumerLoop`, wait strategies, observer
//! - `resilience`: Consumer-side sequence validation
//! - `perf`: Metrics, latency histogram, CPU affinity
//! - `config`: `CoreConfig` with serde, validation and profiles
//!
//! ## Example
//! ```
//! use sluice_core::prelude::*;
//! use sluice_core::testing::order_fields;
//!
//! let core = EventCore::new(&CoreConfig::default()).unwrap();
//! let (mut port, mut consumer, observer) = core.split();
//!
//! assert_eq!(port.submit(&order_fields(10)), Ok(1));
//!
//! let mut seen = Vec::new();
//! consumer.drain(&mut |record: &EventRecord| seen.push(record.quantity)).unwrap();
//! assert_eq!(seen, vec![10]);
//! assert_eq!(observer.snapshot().processed, 1);
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod perf;
pub mod pool;
pub mod resilience;
pub mod ring;
pub mod testing;
pub mod utils;

// Re-export core types
pub use core::{
    fixed_point, ConfigError, EventFields, EventKind, EventRecord, InvariantViolation, Rejected,
    Side, ViolationKind,
};

pub use config::{Config, CoreConfig, WaitStrategyConfig};
pub use engine::{
    CancelToken, ConsumerLoop, CoreObserver, EventCore, EventHandler, IngestionPort, Poll,
    RunReport,
};
pub use perf::{LatencySummary, MetricsSnapshot};
pub use pool::{EventPool, SlotHandle};
pub use ring::{Published, RingBuffer};

// Re-export error types
pub use anyhow::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    // Core types
    pub use crate::core::{fixed_point, EventFields, EventKind, EventRecord, Rejected, Side};

    // Engine
    pub use crate::engine::{
        CancelToken, ConsumerLoop, CoreObserver, EventCore, EventHandler, IngestionPort, Poll,
        RunReport,
    };

    // Configuration
    pub use crate::config::{CoreConfig, WaitStrategyConfig};

    // Performance utilities
    pub use crate::perf::{pin_to_core, MetricsSnapshot, ThreadRole};

    // Error types
    pub use crate::{Error, Result};
}
