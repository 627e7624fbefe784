// src/health/policy.rs

//! Consecutive-failure accounting.
//!
//! Pure and synchronous so the threshold semantics can be tested without a
//! runtime or a clock.

use super::{CheckResult, HealthVerdict};

/// Tracks consecutive failures and latches the verdict once the budget is
/// exceeded.
///
/// - A healthy result resets the counter to zero.
/// - An unhealthy result increments it; the verdict flips to unhealthy when
///   the counter *exceeds* `max_consecutive_failures`.
/// - Once unhealthy, the verdict never returns to healthy.
#[derive(Debug, Clone)]
pub struct FailureCounter {
    max_consecutive_failures: u32,
    consecutive_failures: u32,
    verdict: HealthVerdict,
}

impl FailureCounter {
    pub fn new(max_consecutive_failures: u32, initial: HealthVerdict) -> Self {
        Self {
            max_consecutive_failures,
            consecutive_failures: 0,
            verdict: initial,
        }
    }

    /// Fold one check result into the verdict and return it.
    pub fn record(&mut self, result: CheckResult) -> &HealthVerdict {
        if result.healthy {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            if self.consecutive_failures > self.max_consecutive_failures {
                self.verdict = HealthVerdict {
                    healthy: false,
                    reason: result.reason,
                };
            }
        }
        &self.verdict
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn verdict(&self) -> &HealthVerdict {
        &self.verdict
    }
}
