//! Gap Detection for the consumer side of the ring
//!
//! Every published record carries the sequence number the ingestion port
//! assigned to it. Sequences start at 1 and only advance on a successful
//! publish, so the consumer must observe exactly 1, 2, 3, ...
//!
//! - Reject-on-full: any deviation is a broken invariant.
//! - Overwrite-on-full: evicted entries never reach the consumer, so forward
//!   jumps are expected (they were counted as drops by the producer). A
//!   repeated or decreasing sequence is still a broken invariant.
//!
//! Sequences are `u64` starting at 1 and never wrap in practice.

use crate::core::InvariantViolation;

/// How forward jumps are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPolicy {
    /// Next sequence must be exactly last + 1
    Strict,
    /// Next sequence must be greater than last
    TolerateForward,
}

impl GapPolicy {
    /// Policy matching the ring's full-buffer behaviour
    pub fn for_overwrite(overwrite_on_full: bool) -> Self {
        if overwrite_on_full {
            GapPolicy::TolerateForward
        } else {
            GapPolicy::Strict
        }
    }
}

/// Validates consumed sequence numbers
///
/// # Example
///
/// ```
/// use sluice_core::resilience::{GapDetector, GapPolicy};
///
/// let mut detector = GapDetector::new(GapPolicy::TolerateForward);
/// assert_eq!(detector.check(1), Ok(0));
/// assert_eq!(detector.check(4), Ok(2)); // 2 and 3 were evicted
/// assert!(detector.check(4).is_err()); // duplicate
/// ```
#[derive(Debug, Clone)]
pub struct GapDetector {
    policy: GapPolicy,
    /// Last sequence number accepted (0 before the first event)
    last_sequence: u64,
    /// Sum of all tolerated gaps
    total_skipped: u64,
}

impl GapDetector {
    pub fn new(policy: GapPolicy) -> Self {
        Self {
            policy,
            last_sequence: 0,
            total_skipped: 0,
        }
    }

    /// Check the next consumed sequence number
    ///
    /// Returns the number of skipped sequences (always 0 under `Strict`).
    #[inline(always)]
    pub fn check(&mut self, sequence: u64) -> Result<u64, InvariantViolation> {
        let expected = self.last_sequence + 1;
        if sequence == expected {
            self.last_sequence = sequence;
            return Ok(0);
        }
        self.check_slow(sequence, expected)
    }

    #[cold]
    fn check_slow(&mut self, sequence: u64, expected: u64) -> Result<u64, InvariantViolation> {
        if sequence <= self.last_sequence {
            return Err(InvariantViolation::SequenceRegression {
                last: self.last_sequence,
                actual: sequence,
            });
        }

        match self.policy {
            GapPolicy::Strict => Err(InvariantViolation::SequenceGap {
                expected,
                actual: sequence,
            }),
            GapPolicy::TolerateForward => {
                let gap = sequence - expected;
                self.last_sequence = sequence;
                self.total_skipped += gap;
                Ok(gap)
            }
        }
    }

    pub fn policy(&self) -> GapPolicy {
        self.policy
    }

    /// Get last accepted sequence number
    #[inline]
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Total sequences skipped since creation
    #[inline]
    pub fn total_skipped(&self) -> u64 {
        self.total_skipped
    }
}
