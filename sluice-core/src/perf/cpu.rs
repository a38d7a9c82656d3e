//! CPU Affinity and Thread Priority Utilities
//!
//! The producer and consumer threads each want a core of their own; sharing
//! one with other work shows up directly as hand-off latency jitter.

use anyhow::Result;
use core_affinity::CoreId;

/// Which side of the hand-off a thread runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRole {
    Producer,
    Consumer,
}

impl std::fmt::Display for ThreadRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadRole::Producer => f.write_str("producer"),
            ThreadRole::Consumer => f.write_str("consumer"),
        }
    }
}

/// Pin the current thread to a specific CPU core
///
/// # Example
/// ```no_run
/// use sluice_core::perf::cpu::pin_to_core;
/// pin_to_core(2).expect("Failed to pin to core 2");
/// ```
pub fn pin_to_core(core: usize) -> Result<()> {
    let core_id = CoreId { id: core };

    if core_affinity::set_for_current(core_id) {
        tracing::info!("Pinned thread to CPU core {}", core);
        Ok(())
    } else {
        anyhow::bail!("Failed to pin thread to core {}", core)
    }
}

/// Set real-time thread priority (Linux only)
///
/// Requires CAP_SYS_NICE or root. Uses SCHED_FIFO.
#[cfg(target_os = "linux")]
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    use libc::{sched_param, sched_setscheduler, SCHED_FIFO};

    let param = sched_param {
        sched_priority: priority,
    };

    // SAFETY: pid 0 targets the calling thread; `param` outlives the call.
    let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc == 0 {
        tracing::info!("Set thread priority to SCHED_FIFO:{}", priority);
        Ok(())
    } else {
        anyhow::bail!("Failed to set thread priority (may need CAP_SYS_NICE or root)")
    }
}

/// Set real-time thread priority (non-Linux platforms)
///
/// On non-Linux platforms, this is a no-op with a warning.
#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority(_priority: i32) -> Result<()> {
    tracing::warn!("Real-time priority setting not supported on this platform");
    Ok(())
}

/// Get the number of available CPU cores
pub fn num_cores() -> usize {
    core_affinity::get_core_ids()
        .map(|ids| ids.len())
        .unwrap_or(1)
}

/// Prepare the current thread for its side of the hand-off
///
/// Pinning failure is an error; a missing real-time privilege only warns,
/// since most deployments run without CAP_SYS_NICE.
pub fn optimize_thread(role: ThreadRole, core: usize, priority: Option<i32>) -> Result<()> {
    pin_to_core(core)?;

    if let Some(priority) = priority {
        if let Err(e) = set_realtime_priority(priority) {
            tracing::warn!("{} thread keeps default scheduling: {:#}", role, e);
        }
    }

    tracing::info!(%role, core, ?priority, "Thread optimized");
    Ok(())
}
