pub mod constants;
pub mod profiles;
pub mod types;

pub use profiles::ProfileName;
pub use types::*;

use crate::core::ConfigError;
use crate::pool::validate_capacity;
use anyhow::{Context, Result};
use constants::{ENV_OVERWRITE_ON_FULL, ENV_POOL_CAPACITY, ENV_RING_CAPACITY};
use std::path::Path;

impl Config {
    /// Load configuration from a JSON file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();

        let raw = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let mut cfg: Config =
            serde_json::from_str(&raw).context("Failed to deserialize configuration")?;

        cfg.core.apply_env_overrides()?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.core.validate()?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel {
                level: self.logging.log_level.clone(),
            });
        }

        Ok(())
    }
}

impl CoreConfig {
    /// Parse a core config from a JSON string (missing fields take defaults)
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: CoreConfig =
            serde_json::from_str(raw).context("Failed to deserialize core configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Override capacities and overwrite mode from `SLUICE_*` variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var(ENV_POOL_CAPACITY) {
            self.pool_capacity = v
                .parse()
                .with_context(|| format!("{ENV_POOL_CAPACITY}={v} is not an integer"))?;
        }
        if let Ok(v) = std::env::var(ENV_RING_CAPACITY) {
            self.ring_capacity = v
                .parse()
                .with_context(|| format!("{ENV_RING_CAPACITY}={v} is not an integer"))?;
        }
        if let Ok(v) = std::env::var(ENV_OVERWRITE_ON_FULL) {
            self.overwrite_on_full = v
                .parse()
                .with_context(|| format!("{ENV_OVERWRITE_ON_FULL}={v} is not a bool"))?;
        }
        Ok(())
    }

    /// Validate configuration values
    ///
    /// Capacities must be non-zero powers of two no larger than `MAX_CAPACITY`.
    /// A ring larger than the pool is legal but can never fill, so it only
    /// gets a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_capacity("pool_capacity", self.pool_capacity)?;
        validate_capacity("ring_capacity", self.ring_capacity)?;

        if self.ring_capacity > self.pool_capacity {
            tracing::warn!(
                "ring_capacity {} exceeds pool_capacity {}: the pool will always exhaust first",
                self.ring_capacity,
                self.pool_capacity
            );
        }

        match self.consumer_wait_strategy {
            WaitStrategyConfig::Spin { budget: 0 } => {
                return Err(ConfigError::InvalidWaitStrategy {
                    reason: "spin budget must be non-zero".to_string(),
                });
            }
            WaitStrategyConfig::Block { timeout_us: 0 } => {
                return Err(ConfigError::InvalidWaitStrategy {
                    reason: "block timeout must be non-zero".to_string(),
                });
            }
            WaitStrategyConfig::Phased {
                block_timeout_us: 0,
                ..
            } => {
                return Err(ConfigError::InvalidWaitStrategy {
                    reason: "phased block timeout must be non-zero".to_string(),
                });
            }
            _ => {}
        }

        if self.latency_max_ns < 2 {
            return Err(ConfigError::InvalidLatencyBound {
                value: self.latency_max_ns,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.core.pool_capacity, 4096);
        assert!(!config.core.overwrite_on_full);
    }

    #[test]
    fn test_capacity_validation() {
        let mut core = CoreConfig::default();

        core.pool_capacity = 0;
        assert_eq!(
            core.validate(),
            Err(ConfigError::ZeroCapacity {
                name: "pool_capacity"
            })
        );

        core.pool_capacity = 1000;
        assert!(matches!(
            core.validate(),
            Err(ConfigError::NotPowerOfTwo { value: 1000, .. })
        ));

        core.pool_capacity = 1024;
        core.ring_capacity = 3;
        assert!(matches!(
            core.validate(),
            Err(ConfigError::NotPowerOfTwo {
                name: "ring_capacity",
                ..
            })
        ));

        core.ring_capacity = constants::MAX_CAPACITY * 2;
        assert!(matches!(
            core.validate(),
            Err(ConfigError::CapacityTooLarge { .. })
        ));
    }

    #[test]
    fn test_ring_larger_than_pool_is_allowed() {
        let core = CoreConfig {
            pool_capacity: 16,
            ring_capacity: 64,
            ..Default::default()
        };
        assert!(core.validate().is_ok());
    }

    #[test]
    fn test_wait_strategy_validation() {
        let mut core = CoreConfig::default();

        core.consumer_wait_strategy = WaitStrategyConfig::Spin { budget: 0 };
        assert!(matches!(
            core.validate(),
            Err(ConfigError::InvalidWaitStrategy { .. })
        ));

        core.consumer_wait_strategy = WaitStrategyConfig::Block { timeout_us: 0 };
        assert!(core.validate().is_err());

        core.consumer_wait_strategy = WaitStrategyConfig::Yield;
        assert!(core.validate().is_ok());
    }

    #[test]
    fn test_from_json_defaults_and_tags() {
        let core = CoreConfig::from_json_str(
            r#"{ "pool_capacity": 64, "consumer_wait_strategy": { "type": "block", "timeout_us": 250 } }"#,
        )
        .unwrap();

        assert_eq!(core.pool_capacity, 64);
        assert_eq!(core.ring_capacity, constants::DEFAULT_RING_CAPACITY);
        assert_eq!(
            core.consumer_wait_strategy,
            WaitStrategyConfig::Block { timeout_us: 250 }
        );

        let spin = CoreConfig::from_json_str(r#"{ "consumer_wait_strategy": { "type": "spin" } }"#)
            .unwrap();
        assert_eq!(
            spin.consumer_wait_strategy,
            WaitStrategyConfig::Spin {
                budget: constants::DEFAULT_SPIN_BUDGET
            }
        );

        assert!(CoreConfig::from_json_str(r#"{ "ring_capacity": 5 }"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "core": {{ "pool_capacity": 256, "ring_capacity": 128, "overwrite_on_full": true }},
                "logging": {{ "log_level": "debug" }} }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.core.pool_capacity, 256);
        assert_eq!(config.core.ring_capacity, 128);
        assert!(config.core.overwrite_on_full);
        assert_eq!(config.logging.log_level, "debug");
        assert!(!config.logging.json_logs);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.log_level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));
    }
}
