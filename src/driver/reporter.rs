// src/driver/reporter.rs

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::types::{StatusUpdate, TaskId, TaskState};

use super::{Driver, DriverError};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("status {next} cannot follow {previous:?}")]
    OutOfOrder {
        previous: Option<TaskState>,
        next: TaskState,
    },

    #[error("status update was not delivered: {0}")]
    Delivery(#[from] DriverError),
}

/// The only path by which task status reaches the driver.
///
/// Enforces that the reported sequence is a prefix of
/// `STARTING -> RUNNING -> <terminal>`: the first update must be `STARTING`,
/// states only move forward, and nothing follows a terminal state. Updates
/// that would break this are rejected without touching the driver.
///
/// A failed delivery still counts as reported for ordering purposes; the
/// error is returned so the caller can log it and move on.
pub struct StatusReporter {
    driver: Arc<dyn Driver>,
    last: Option<TaskState>,
}

impl StatusReporter {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver, last: None }
    }

    /// Last state handed to the driver, if any.
    pub fn last_reported(&self) -> Option<TaskState> {
        self.last
    }

    pub fn report(
        &mut self,
        task_id: &TaskId,
        state: TaskState,
        message: Option<String>,
    ) -> Result<(), ReportError> {
        if !self.may_follow(state) {
            warn!(
                task_id = %task_id,
                previous = ?self.last,
                next = %state,
                "refusing out-of-order status update"
            );
            return Err(ReportError::OutOfOrder {
                previous: self.last,
                next: state,
            });
        }
        self.last = Some(state);

        let update = StatusUpdate {
            task_id: task_id.clone(),
            state,
            message,
        };
        info!(task_id = %task_id, state = %state, message = ?update.message, "sending status update");

        self.driver.send_status_update(&update).map_err(|e| {
            warn!(task_id = %task_id, state = %state, error = %e, "status update delivery failed");
            ReportError::from(e)
        })
    }

    /// Signal the driver to stop.
    pub fn stop_driver(&self) {
        info!("stopping driver");
        self.driver.stop();
    }

    fn may_follow(&self, next: TaskState) -> bool {
        match self.last {
            None => next == TaskState::Starting,
            Some(prev) if prev.is_terminal() => false,
            Some(prev) => next.rank() > prev.rank(),
        }
    }
}
