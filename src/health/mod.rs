// src/health/mod.rs

//! Generic periodic health checking with a sticky failure verdict.
//!
//! - [`policy`] is the pure consecutive-failure accounting.
//! - [`monitor`] runs a [`HealthCheck`] on an injected clock and publishes
//!   the resulting [`HealthVerdict`].
//! - [`command`] provides a shell-command check used by the binary.

use std::time::Duration;

pub mod command;
pub mod monitor;
pub mod policy;

pub use command::CommandHealthCheck;
pub use monitor::HealthMonitor;
pub use policy::FailureCounter;

/// Outcome of a single health check invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub healthy: bool,
    pub reason: Option<String>,
}

impl CheckResult {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            reason: None,
        }
    }

    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            healthy: false,
            reason: Some(reason.into()),
        }
    }
}

/// A pluggable health check.
///
/// Returning `Err` (or panicking) counts as one unhealthy result whose reason
/// is the error message.
pub trait HealthCheck: Send + Sync + 'static {
    fn check(&self) -> anyhow::Result<CheckResult>;
}

impl<F> HealthCheck for F
where
    F: Fn() -> anyhow::Result<CheckResult> + Send + Sync + 'static,
{
    fn check(&self) -> anyhow::Result<CheckResult> {
        self()
    }
}

/// Current health of a monitored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    pub healthy: bool,
    pub reason: Option<String>,
}

impl HealthVerdict {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            reason: None,
        }
    }

    /// Human-readable failure reason, `None` while healthy.
    pub fn failure_reason(&self) -> Option<String> {
        if self.healthy {
            return None;
        }
        Some(match &self.reason {
            Some(reason) => format!("Failed health check! {}", reason),
            None => "Failed health check!".to_string(),
        })
    }
}

impl From<CheckResult> for HealthVerdict {
    fn from(result: CheckResult) -> Self {
        Self {
            healthy: result.healthy,
            reason: result.reason,
        }
    }
}

/// Timing and failure budget for a [`HealthMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthMonitorSettings {
    /// Steady-state period between checks.
    pub interval: Duration,
    /// Delay before the first check; `None` means twice `interval`.
    pub initial_interval: Option<Duration>,
    /// Failures tolerated before the verdict latches unhealthy.
    pub max_consecutive_failures: u32,
}

impl HealthMonitorSettings {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            initial_interval: None,
            max_consecutive_failures: 0,
        }
    }

    pub fn effective_initial_interval(&self) -> Duration {
        self.initial_interval.unwrap_or(self.interval * 2)
    }
}

impl Default for HealthMonitorSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
