// src/clock/mock.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::{Clock, Sleep};

/// Clock that only moves when [`ManualClock::advance`] is called.
///
/// Sleepers subscribe to the current time and wake once it reaches their
/// deadline, so a test can step a background loop one interval at a time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<watch::Sender<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Duration::ZERO);
        Self { now: Arc::new(tx) }
    }

    /// Move time forward, waking every sleeper whose deadline has passed.
    pub fn advance(&self, by: Duration) {
        self.now.send_modify(|now| *now += by);
    }

    /// Number of sleeps currently waiting on this clock.
    pub fn pending_sleepers(&self) -> usize {
        self.now.receiver_count()
    }

    /// Wait (in real time) until at least `n` sleeps are pending.
    ///
    /// Used by tests to make sure a background loop has reached its sleep
    /// before time is advanced.
    pub async fn wait_for_sleepers(&self, n: usize) {
        while self.pending_sleepers() < n {
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.borrow()
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        let mut rx = self.now.subscribe();
        let deadline = *rx.borrow() + duration;
        Box::pin(async move {
            // Sender lives as long as the clock; an error just ends the sleep.
            let _ = rx.wait_for(|now| *now >= deadline).await;
        })
    }
}
