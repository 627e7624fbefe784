// src/clock/mod.rs

//! Injected time source.
//!
//! Everything that waits (health monitor loop, status manager polling, launch
//! timer, initialization polling, stop wait) goes through a [`Clock`] so that
//! tests can drive time explicitly with [`mock::ManualClock`].

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;

pub mod mock;

/// Future returned by [`Clock::sleep`].
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Abstract clock: current time plus sleeping.
pub trait Clock: Send + Sync + Debug {
    /// Time elapsed since this clock was created.
    fn now(&self) -> Duration;

    /// Resolve once `duration` has elapsed on this clock.
    ///
    /// The deadline is fixed when `sleep` is called, not when the returned
    /// future is first polled.
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// Implementation backed by `tokio::time`.
#[derive(Debug, Clone)]
pub struct TokioClock {
    epoch: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }
}
