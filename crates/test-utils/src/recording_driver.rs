use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use taskwarden::driver::{Driver, DriverError};
use taskwarden::types::{StatusUpdate, TaskState};

/// A driver that records every status update and the stop signal.
pub struct RecordingDriver {
    updates: watch::Sender<Vec<StatusUpdate>>,
    stopped: watch::Sender<bool>,
    fail_deliveries: AtomicBool,
}

impl RecordingDriver {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(Vec::new());
        let (stopped, _) = watch::channel(false);
        Self {
            updates,
            stopped,
            fail_deliveries: AtomicBool::new(false),
        }
    }

    /// Record updates but report every delivery as failed.
    pub fn failing() -> Self {
        let driver = Self::new();
        driver.fail_deliveries.store(true, Ordering::SeqCst);
        driver
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.borrow().clone()
    }

    pub fn states(&self) -> Vec<TaskState> {
        self.updates.borrow().iter().map(|u| u.state).collect()
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Resolve once `state` has been recorded.
    pub async fn wait_for_state(&self, state: TaskState) {
        let mut rx = self.updates.subscribe();
        let _ = rx
            .wait_for(|updates| updates.iter().any(|u| u.state == state))
            .await;
    }

    pub async fn wait_stopped(&self) {
        let mut rx = self.stopped.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for RecordingDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for RecordingDriver {
    fn send_status_update(&self, update: &StatusUpdate) -> Result<(), DriverError> {
        self.updates.send_modify(|updates| updates.push(update.clone()));
        if self.fail_deliveries.load(Ordering::SeqCst) {
            return Err(DriverError::Transport("scheduler unreachable".to_string()));
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.send_replace(true);
    }
}
