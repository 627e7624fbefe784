// src/health/monitor.rs

//! Background health-check loop.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;

use super::policy::FailureCounter;
use super::{CheckResult, HealthCheck, HealthMonitorSettings, HealthVerdict};

/// Runs a [`HealthCheck`] periodically and exposes a sticky verdict.
///
/// The verdict lives in a `watch` channel: the loop is the only writer,
/// readers always see a whole value, and consumers can [`subscribe`] to be
/// woken on change instead of polling.
///
/// [`subscribe`]: HealthMonitor::subscribe
pub struct HealthMonitor {
    verdict_rx: watch::Receiver<HealthVerdict>,
    /// Loop state, moved into the background task by `start`.
    pending: Option<PendingLoop>,
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

struct PendingLoop {
    check: Arc<dyn HealthCheck>,
    settings: HealthMonitorSettings,
    clock: Arc<dyn Clock>,
    counter: FailureCounter,
    verdict_tx: watch::Sender<HealthVerdict>,
}

impl HealthMonitor {
    /// Build a monitor without starting its loop.
    ///
    /// With a zero initial interval the check runs once, synchronously, and
    /// its result becomes the initial verdict. Otherwise the monitor starts
    /// out healthy until the first check completes.
    pub fn new(
        check: Arc<dyn HealthCheck>,
        settings: HealthMonitorSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let initial = if settings.effective_initial_interval().is_zero() {
            let verdict = HealthVerdict::from(evaluate(check.as_ref()));
            debug!(healthy = verdict.healthy, "initial synchronous health check");
            verdict
        } else {
            HealthVerdict::healthy()
        };

        let (verdict_tx, verdict_rx) = watch::channel(initial.clone());
        let counter = FailureCounter::new(settings.max_consecutive_failures, initial);

        Self {
            verdict_rx,
            pending: Some(PendingLoop {
                check,
                settings,
                clock,
                counter,
                verdict_tx,
            }),
            stop: CancellationToken::new(),
            handle: None,
        }
    }

    /// Spawn the check loop. Calling it again has no effect.
    pub fn start(&mut self) {
        let Some(pending) = self.pending.take() else {
            debug!("health monitor already started");
            return;
        };
        let stop = self.stop.clone();
        self.handle = Some(tokio::spawn(run_loop(pending, stop)));
    }

    /// Ask the loop to exit. Idempotent; an in-flight check is not interrupted.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn healthy(&self) -> bool {
        self.verdict_rx.borrow().healthy
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.verdict_rx.borrow().failure_reason()
    }

    pub fn verdict(&self) -> HealthVerdict {
        self.verdict_rx.borrow().clone()
    }

    /// Receiver that is notified whenever the verdict changes.
    ///
    /// The sender is dropped when the loop exits, so `changed()` then errors.
    pub fn subscribe(&self) -> watch::Receiver<HealthVerdict> {
        self.verdict_rx.clone()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn run_loop(mut state: PendingLoop, stop: CancellationToken) {
    let initial = state.settings.effective_initial_interval();
    debug!(?initial, interval = ?state.settings.interval, "health monitor loop started");

    tokio::select! {
        _ = stop.cancelled() => return,
        _ = state.clock.sleep(initial) => {}
    }

    while !stop.is_cancelled() {
        let check = Arc::clone(&state.check);
        let result = match tokio::task::spawn_blocking(move || evaluate(check.as_ref())).await {
            Ok(result) => result,
            Err(e) => {
                debug!(error = %e, "health check task cancelled; stopping monitor");
                break;
            }
        };

        let was_healthy = state.counter.verdict().healthy;
        let verdict = state.counter.record(result).clone();
        if was_healthy && !verdict.healthy {
            info!(reason = ?verdict.reason, "health verdict latched unhealthy");
        }
        state.verdict_tx.send_if_modified(|current| {
            if *current != verdict {
                *current = verdict;
                true
            } else {
                false
            }
        });

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = state.clock.sleep(state.settings.interval) => {}
        }
    }

    debug!("health monitor loop finished");
}

/// Run a check, folding errors and panics into an unhealthy result.
fn evaluate(check: &dyn HealthCheck) -> CheckResult {
    match catch_unwind(AssertUnwindSafe(|| check.check())) {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(error = %e, "health check returned an error");
            CheckResult::unhealthy(format!("health check error: {e:#}"))
        }
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(panic = %msg, "health check panicked");
            CheckResult::unhealthy(format!("health check panicked: {msg}"))
        }
    }
}
