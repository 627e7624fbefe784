// src/executor/status.rs

//! Status manager: watches a started runner until it terminates.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::runner::TaskRunner;

use super::CoreEvent;
use super::runtime::ExecutorEvent;

/// Poll `runner` every `poll_interval` and send one `RunnerExited` event
/// when it reaches a terminal state.
///
/// Returns early if the executor goes away.
pub(crate) async fn watch_runner(
    runner: Arc<dyn TaskRunner>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    events: mpsc::Sender<ExecutorEvent>,
) {
    loop {
        let state = runner.poll_terminal_state();
        if state.is_terminal() {
            let message = runner.terminal_message();
            info!(?state, ?message, "runner reached terminal state");
            let event = ExecutorEvent::Core(CoreEvent::RunnerExited { state, message });
            if events.send(event).await.is_err() {
                debug!("executor gone before runner exit was delivered");
            }
            return;
        }

        tokio::select! {
            _ = events.closed() => {
                debug!("executor gone; status manager exiting");
                return;
            }
            _ = clock.sleep(poll_interval) => {}
        }
    }
}
