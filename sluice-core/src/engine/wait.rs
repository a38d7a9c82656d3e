//! Consumer wait strategies
//!
//! `consume` never blocks; this is the only place the consumer thread may
//! spin, yield or park. Every `idle` call is bounded so the consumer loop can
//! check its cancellation token between calls.

use crate::config::WaitStrategyConfig;
use crossbeam_utils::Backoff;
use std::time::Duration;

/// What the consumer does after a poll found the ring empty
pub trait WaitStrategy: Send {
    /// Called once per empty poll
    fn idle(&mut self);

    /// Called after an event was processed
    #[inline(always)]
    fn reset(&mut self) {}
}

/// Busy spin with CPU pause hints. Lowest latency, burns a core.
#[derive(Debug, Clone, Copy)]
pub struct BusySpin {
    budget: u32,
}

impl BusySpin {
    /// `budget` pause hints per empty poll
    pub fn new(budget: u32) -> Self {
        Self {
            budget: budget.max(1),
        }
    }
}

impl WaitStrategy for BusySpin {
    #[inline(always)]
    fn idle(&mut self) {
        for _ in 0..self.budget {
            std::hint::spin_loop();
        }
    }
}

/// Give up the time slice on every empty poll
#[derive(Debug, Clone, Copy, Default)]
pub struct Yielding;

impl WaitStrategy for Yielding {
    #[inline]
    fn idle(&mut self) {
        std::thread::yield_now();
    }
}

/// Park the consumer thread with a timeout
///
/// The producer never unparks the consumer (that would put a syscall on the
/// publish path), so the timeout bounds the added latency.
#[derive(Debug, Clone, Copy)]
pub struct Blocking {
    timeout: Duration,
}

impl Blocking {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl WaitStrategy for Blocking {
    #[inline]
    fn idle(&mut self) {
        std::thread::park_timeout(self.timeout);
    }
}

/// Spin, then yield, then park
///
/// Spinning uses `crossbeam_utils::Backoff`, whose exponential pause keeps
/// the first empty polls cheap while still reacting within nanoseconds.
#[derive(Debug)]
pub struct Phased {
    spin_budget: u32,
    yield_budget: u32,
    timeout: Duration,
    empty_polls: u32,
    backoff: Backoff,
}

impl Phased {
    pub fn new(spin_budget: u32, yield_budget: u32, timeout: Duration) -> Self {
        Self {
            spin_budget,
            yield_budget,
            timeout,
            empty_polls: 0,
            backoff: Backoff::new(),
        }
    }

    /// Number of consecutive empty polls since the last event
    pub fn empty_polls(&self) -> u32 {
        self.empty_polls
    }
}

impl WaitStrategy for Phased {
    #[inline]
    fn idle(&mut self) {
        let polls = self.empty_polls;
        self.empty_polls = polls.saturating_add(1);

        if polls < self.spin_budget {
            self.backoff.spin();
        } else if polls - self.spin_budget < self.yield_budget {
            std::thread::yield_now();
        } else {
            std::thread::park_timeout(self.timeout);
        }
    }

    #[inline(always)]
    fn reset(&mut self) {
        if self.empty_polls != 0 {
            self.empty_polls = 0;
            self.backoff.reset();
        }
    }
}

/// Wait strategy selected at runtime from configuration
#[derive(Debug)]
pub enum ConfiguredWait {
    Spin(BusySpin),
    Yield(Yielding),
    Block(Blocking),
    Phased(Phased),
}

impl ConfiguredWait {
    pub fn from_config(config: &WaitStrategyConfig) -> Self {
        match *config {
            WaitStrategyConfig::Spin { budget } => ConfiguredWait::Spin(BusySpin::new(budget)),
            WaitStrategyConfig::Yield => ConfiguredWait::Yield(Yielding),
            WaitStrategyConfig::Block { timeout_us } => {
                ConfiguredWait::Block(Blocking::new(Duration::from_micros(timeout_us)))
            }
            WaitStrategyConfig::Phased {
                spin_budget,
                yield_budget,
                block_timeout_us,
            } => ConfiguredWait::Phased(Phased::new(
                spin_budget,
                yield_budget,
                Duration::from_micros(block_timeout_us),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConfiguredWait::Spin(_) => "spin",
            ConfiguredWait::Yield(_) => "yield",
            ConfiguredWait::Block(_) => "block",
            ConfiguredWait::Phased(_) => "phased",
        }
    }
}

impl WaitStrategy for ConfiguredWait {
    #[inline]
    fn idle(&mut self) {
        match self {
            ConfiguredWait::Spin(w) => w.idle(),
            ConfiguredWait::Yield(w) => w.idle(),
            ConfiguredWait::Block(w) => w.idle(),
            ConfiguredWait::Phased(w) => w.idle(),
        }
    }

    #[inline(always)]
    fn reset(&mut self) {
        if let ConfiguredWait::Phased(w) = self {
            w.reset();
        }
    }
}
