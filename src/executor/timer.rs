// src/executor/timer.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::Clock;

use super::CoreEvent;
use super::runtime::ExecutorEvent;

/// One-shot deadline for receiving a task.
///
/// If it fires before [`cancel`](LaunchTimer::cancel) it sends
/// `LaunchDeadlineElapsed` to the executor, which then stops the driver.
#[derive(Debug)]
pub struct LaunchTimer {
    cancel: CancellationToken,
}

impl LaunchTimer {
    pub(crate) fn start(
        deadline: Duration,
        clock: Arc<dyn Clock>,
        events: mpsc::Sender<ExecutorEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("launch timer cancelled");
                }
                _ = clock.sleep(deadline) => {
                    info!(?deadline, "launch deadline elapsed");
                    let _ = events
                        .send(ExecutorEvent::Core(CoreEvent::LaunchDeadlineElapsed))
                        .await;
                }
            }
        });

        Self { cancel }
    }

    /// Cancel the deadline. Safe to call more than once.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LaunchTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
