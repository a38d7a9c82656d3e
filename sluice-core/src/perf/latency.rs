//! Publish -> processed latency distribution
//!
//! Owned by the consumer thread; never shared, never locked. The histogram is
//! sized once at construction, so recording does not allocate.

use crate::config::constants::LATENCY_SIGNIFICANT_FIGURES;
use crate::core::ConfigError;
use hdrhistogram::Histogram;

/// HDR histogram of per-event latencies in nanoseconds
#[derive(Debug, Clone)]
pub struct LatencyRecorder {
    histogram: Histogram<u64>,
}

impl LatencyRecorder {
    /// Track latencies from 1ns up to `max_ns`; larger values saturate
    pub fn new(max_ns: u64) -> Result<Self, ConfigError> {
        let histogram = Histogram::new_with_bounds(1, max_ns, LATENCY_SIGNIFICANT_FIGURES)
            .map_err(|_| ConfigError::InvalidLatencyBound { value: max_ns })?;
        Ok(Self { histogram })
    }

    #[inline(always)]
    pub fn record(&mut self, latency_ns: u64) {
        self.histogram.saturating_record(latency_ns.max(1));
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Percentile summary of everything recorded so far
    pub fn summary(&self) -> LatencySummary {
        let h = &self.histogram;
        if h.is_empty() {
            return LatencySummary::default();
        }
        LatencySummary {
            count: h.len(),
            min_ns: h.min(),
            p50_ns: h.value_at_quantile(0.50),
            p90_ns: h.value_at_quantile(0.90),
            p99_ns: h.value_at_quantile(0.99),
            p999_ns: h.value_at_quantile(0.999),
            max_ns: h.max(),
            mean_ns: h.mean(),
        }
    }
}

/// Latency percentiles in nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ns: u64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p99_ns: u64,
    pub p999_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let recorder = LatencyRecorder::new(1_000_000).unwrap();
        assert!(recorder.is_empty());
        assert_eq!(recorder.summary(), LatencySummary::default());
    }

    #[test]
    fn test_percentiles() {
        let mut recorder = LatencyRecorder::new(1_000_000).unwrap();
        for ns in 1..=1000 {
            recorder.record(ns);
        }

        let summary = recorder.summary();
        assert_eq!(summary.count, 1000);
        assert_eq!(summary.min_ns, 1);
        // 3 significant figures: within 0.1%
        assert!((499..=501).contains(&summary.p50_ns));
        assert!((989..=991).contains(&summary.p99_ns));
        assert!(summary.max_ns >= 999);
    }

    #[test]
    fn test_values_above_bound_saturate() {
        let mut recorder = LatencyRecorder::new(1_000).unwrap();
        recorder.record(5_000_000);
        recorder.record(0);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn test_invalid_bound() {
        assert!(LatencyRecorder::new(1).is_err());
    }
}
