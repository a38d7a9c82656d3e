//! Centralized defaults for the hand-off core
//!
//! All values are compile-time constants; runtime overrides go through
//! `CoreConfig`.

// ===== CAPACITIES =====

/// Default number of pooled event records
pub const DEFAULT_POOL_CAPACITY: usize = 4096;

/// Default number of ring positions (typically <= pool capacity)
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// Largest accepted pool or ring capacity
///
/// Slot indices are `u32` with `u32::MAX` reserved as the free-list sentinel;
/// 16M records of 64 bytes is already 1 GiB.
pub const MAX_CAPACITY: usize = 1 << 24;

// ===== CONSUMER WAIT STRATEGY =====

/// Spin iterations per empty poll for the `spin` strategy
pub const DEFAULT_SPIN_BUDGET: u32 = 128;

/// Park timeout for the `block` strategy (microseconds)
pub const DEFAULT_BLOCK_TIMEOUT_US: u64 = 100;

/// Empty polls spent spinning before the phased strategy starts yielding
pub const DEFAULT_PHASED_SPIN_BUDGET: u32 = 1_000;

/// Empty polls spent yielding before the phased strategy starts parking
pub const DEFAULT_PHASED_YIELD_BUDGET: u32 = 100;

/// Park timeout once the phased strategy reaches its blocking phase (microseconds)
pub const DEFAULT_PHASED_BLOCK_TIMEOUT_US: u64 = 50;

// ===== LATENCY TRACKING =====

/// Highest latency the histogram tracks exactly (1 second); larger values saturate
pub const DEFAULT_LATENCY_MAX_NS: u64 = 1_000_000_000;

/// Significant figures kept by the latency histogram
pub const LATENCY_SIGNIFICANT_FIGURES: u8 = 3;

// ===== ENVIRONMENT OVERRIDES =====

pub const ENV_POOL_CAPACITY: &str = "SLUICE_POOL_CAPACITY";
pub const ENV_RING_CAPACITY: &str = "SLUICE_RING_CAPACITY";
pub const ENV_OVERWRITE_ON_FULL: &str = "SLUICE_OVERWRITE_ON_FULL";
