// src/executor/init.rs

//! Runner construction, initialization and start.
//!
//! Runs off the executor loop so that kill requests stay responsive. The
//! abort flag is checked before construction, while waiting for the runner
//! to finish initializing, and once more right before `start()`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::config::TaskDescriptor;
use crate::runner::{RunnerFactory, TaskRunner};

use super::InitOutcome;

/// Build the runner for `descriptor` and bring it to the started state.
///
/// Returns the runner whenever one was constructed, so the caller can kill
/// and watch it.
pub async fn initialize_task(
    factory: Arc<dyn RunnerFactory>,
    descriptor: &TaskDescriptor,
    abort: CancellationToken,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
) -> (Option<Arc<dyn TaskRunner>>, InitOutcome) {
    if abort.is_cancelled() {
        info!(task_id = %descriptor.task_id, "aborted before runner construction");
        return (None, InitOutcome::Aborted);
    }

    let runner = match factory.create(descriptor) {
        Ok(runner) => runner,
        Err(e) => {
            error!(task_id = %descriptor.task_id, error = %e, "failed to construct task runner");
            return (None, InitOutcome::Failed(e.to_string()));
        }
    };

    let outcome = initialize_and_start(runner.as_ref(), &abort, clock.as_ref(), poll_interval).await;
    debug!(task_id = %descriptor.task_id, ?outcome, "initialization sequence done");
    (Some(runner), outcome)
}

async fn initialize_and_start(
    runner: &dyn TaskRunner,
    abort: &CancellationToken,
    clock: &dyn Clock,
    poll_interval: Duration,
) -> InitOutcome {
    // initialize() itself is not interrupted; a kill arriving meanwhile is
    // honoured as soon as it returns.
    if let Err(e) = runner.initialize().await {
        error!(error = %e, "task initialization failed");
        return InitOutcome::Failed(e.to_string());
    }

    loop {
        if abort.is_cancelled() {
            info!("abort requested during initialization");
            return InitOutcome::Aborted;
        }
        if runner.is_initialized() {
            break;
        }
        tokio::select! {
            _ = abort.cancelled() => {}
            _ = clock.sleep(poll_interval) => {}
        }
    }

    if abort.is_cancelled() {
        info!("abort requested before start");
        return InitOutcome::Aborted;
    }

    match runner.start().await {
        Ok(()) => InitOutcome::Started,
        Err(e) => {
            error!(error = %e, "task start failed");
            InitOutcome::Failed(e.to_string())
        }
    }
}
