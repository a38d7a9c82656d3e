//! Performance Utilities
//!
//! - **CPU affinity**: pin producer and consumer to their own cores
//! - **Lock-free metrics**: cache-aligned atomic counters
//! - **Latency**: consumer-owned HDR histogram

pub mod cpu;
pub mod latency;
pub mod metrics;

// Re-exports for convenience
pub use cpu::{num_cores, optimize_thread, pin_to_core, set_realtime_priority, ThreadRole};
pub use latency::{LatencyRecorder, LatencySummary};
pub use metrics::{CoreMetrics, MetricsSnapshot};
