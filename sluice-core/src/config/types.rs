use super::constants::*;
use serde::{Deserialize, Serialize};

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hand-off core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Number of pooled event records (power of two)
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,

    /// Number of ring positions (power of two, typically <= pool_capacity)
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,

    /// Evict the oldest unread entry instead of rejecting when the ring is full
    #[serde(default)]
    pub overwrite_on_full: bool,

    /// What the consumer does when the ring is empty
    #[serde(default)]
    pub consumer_wait_strategy: WaitStrategyConfig,

    /// Upper bound of the latency histogram (nanoseconds)
    #[serde(default = "default_latency_max_ns")]
    pub latency_max_ns: u64,
}

/// Consumer wait strategy selection
///
/// ```json
/// { "type": "spin", "budget": 128 }
/// { "type": "yield" }
/// { "type": "block", "timeout_us": 100 }
/// { "type": "phased", "spin_budget": 1000, "yield_budget": 100, "block_timeout_us": 50 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitStrategyConfig {
    /// Busy spin, `budget` pause hints between cancellation checks
    Spin {
        #[serde(default = "default_spin_budget")]
        budget: u32,
    },

    /// Yield the time slice on every empty poll
    Yield,

    /// Park the consumer thread for up to `timeout_us` on every empty poll
    Block {
        #[serde(default = "default_block_timeout_us")]
        timeout_us: u64,
    },

    /// Spin, then yield, then park with timeout
    Phased {
        #[serde(default = "default_phased_spin_budget")]
        spin_budget: u32,
        #[serde(default = "default_phased_yield_budget")]
        yield_budget: u32,
        #[serde(default = "default_phased_block_timeout_us")]
        block_timeout_us: u64,
    },
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_pool_capacity() -> usize {
    DEFAULT_POOL_CAPACITY
}

fn default_ring_capacity() -> usize {
    DEFAULT_RING_CAPACITY
}

fn default_latency_max_ns() -> u64 {
    DEFAULT_LATENCY_MAX_NS
}

fn default_spin_budget() -> u32 {
    DEFAULT_SPIN_BUDGET
}

fn default_block_timeout_us() -> u64 {
    DEFAULT_BLOCK_TIMEOUT_US
}

fn default_phased_spin_budget() -> u32 {
    DEFAULT_PHASED_SPIN_BUDGET
}

fn default_phased_yield_budget() -> u32 {
    DEFAULT_PHASED_YIELD_BUDGET
}

fn default_phased_block_timeout_us() -> u64 {
    DEFAULT_PHASED_BLOCK_TIMEOUT_US
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pool_capacity: default_pool_capacity(),
            ring_capacity: default_ring_capacity(),
            overwrite_on_full: false,
            consumer_wait_strategy: WaitStrategyConfig::default(),
            latency_max_ns: default_latency_max_ns(),
        }
    }
}

impl Default for WaitStrategyConfig {
    fn default() -> Self {
        WaitStrategyConfig::Phased {
            spin_budget: default_phased_spin_budget(),
            yield_budget: default_phased_yield_budget(),
            block_timeout_us: default_phased_block_timeout_us(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}
