//! Configuration profiles for different deployments
//!
//! The right consumer wait strategy is deployment-specific:
//! - LowLatency: dedicated core, busy spin, never parks
//! - Balanced: spin, then yield, then park briefly (default)
//! - Efficient: shared hosts, parks almost immediately

use super::constants::*;
use super::types::*;

/// Configuration profile name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileName {
    LowLatency,
    Balanced,
    Efficient,
}

impl ProfileName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowLatency => "low-latency",
            Self::Balanced => "balanced",
            Self::Efficient => "efficient",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low-latency" | "latency" | "spin" => Some(Self::LowLatency),
            "balanced" | "default" => Some(Self::Balanced),
            "efficient" | "block" => Some(Self::Efficient),
            _ => None,
        }
    }

    /// Core configuration for this profile
    pub fn core_config(&self) -> CoreConfig {
        match self {
            Self::LowLatency => CoreConfig {
                pool_capacity: 16_384,
                ring_capacity: 8_192,
                consumer_wait_strategy: WaitStrategyConfig::Spin {
                    budget: DEFAULT_SPIN_BUDGET,
                },
                ..CoreConfig::default()
            },
            Self::Balanced => CoreConfig::default(),
            Self::Efficient => CoreConfig {
                pool_capacity: 1_024,
                ring_capacity: 512,
                consumer_wait_strategy: WaitStrategyConfig::Block {
                    timeout_us: 1_000,
                },
                ..CoreConfig::default()
            },
        }
    }
}

impl std::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
