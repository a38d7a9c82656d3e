//! Common utilities for all binaries
//!
//! Shared initialization, CLI parsing, and setup code.

use anyhow::{Context, Result};
use clap::Parser;
use sluice_core::config::{Config, ProfileName};
use sluice_core::perf::cpu::{optimize_thread, ThreadRole};
use sluice_core::{MetricsSnapshot, RunReport};
use std::path::PathBuf;

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// JSON config file (overrides the profile)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Built-in profile: low-latency, balanced, efficient
    #[arg(short, long, default_value = "balanced")]
    pub profile: String,

    /// Evict the oldest unread event instead of rejecting when full
    #[arg(long)]
    pub overwrite: bool,

    /// CPU core to pin the producer thread to
    #[arg(long)]
    pub producer_core: Option<usize>,

    /// CPU core to pin the consumer thread to
    #[arg(long)]
    pub consumer_core: Option<usize>,

    /// Enable real-time priority (requires privileges)
    #[arg(long)]
    pub realtime: bool,

    /// Log level (overrides the config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Resolve the configuration: file if given, otherwise the profile
    ///
    /// `SLUICE_*` environment variables and `--overwrite` apply on top.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => {
                let profile = ProfileName::parse(&self.profile)
                    .with_context(|| format!("Unknown profile '{}'", self.profile))?;
                let mut config = Config {
                    core: profile.core_config(),
                    ..Config::default()
                };
                config.core.apply_env_overrides()?;
                config
            }
        };

        if self.overwrite {
            config.core.overwrite_on_full = true;
        }
        if let Some(level) = &self.log_level {
            config.logging.log_level = level.clone();
        }
        config.logging.json_logs |= self.json_logs;
        config.validate()?;

        Ok(config)
    }
}

/// Initialize tracing/logging
pub fn init_logging(config: &Config) -> Result<()> {
    sluice_core::utils::init_from_config(&config.logging)
}

/// Setup CPU affinity and real-time priority for one side of the hand-off
///
/// Called from inside the thread being tuned.
pub fn setup_performance(role: ThreadRole, cpu_core: Option<usize>, realtime: bool) -> Result<()> {
    match cpu_core {
        Some(core) => optimize_thread(role, core, realtime.then_some(50)),
        None => {
            if realtime {
                tracing::warn!("{} thread: --realtime ignored without a pinned core", role);
            }
            Ok(())
        }
    }
}

/// Print final statistics
pub fn print_stats(snapshot: &MetricsSnapshot, report: &RunReport) {
    tracing::info!("=== Final Statistics ===");
    tracing::info!("Submitted: {}", snapshot.submitted);
    tracing::info!(
        "Rejected: {} (pool exhausted {}, buffer full {}, halted {})",
        snapshot.rejected_total(),
        snapshot.rejected_pool_exhausted,
        snapshot.rejected_buffer_full,
        snapshot.rejected_halted
    );
    tracing::info!("Processed: {}", snapshot.processed);
    tracing::info!("Dropped (overwritten): {}", snapshot.dropped);
    tracing::info!("Abandoned: {}", snapshot.abandoned);
    tracing::info!("Throughput: {:.0} events/s", report.throughput());

    if snapshot.submitted > 0 {
        tracing::info!("Reject rate: {:.2}%", snapshot.reject_rate() * 100.0);
    }

    let latency = &report.latency;
    if latency.count > 0 {
        tracing::info!(
            "Latency (ns): min {} p50 {} p90 {} p99 {} p99.9 {} max {} mean {:.0}",
            latency.min_ns,
            latency.p50_ns,
            latency.p90_ns,
            latency.p99_ns,
            latency.p999_ns,
            latency.max_ns,
            latency.mean_ns
        );
    }

    if let Some(violation) = snapshot.violation {
        tracing::error!("Core halted: {:?}", violation);
    }
}
