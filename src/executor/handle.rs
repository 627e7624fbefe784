// src/executor/handle.rs

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::TaskDescriptor;
use crate::errors::{Result, TaskwardenError};
use crate::types::TaskId;

use super::CoreEvent;
use super::runtime::ExecutorEvent;

/// Whether the executor took a launch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchAck {
    /// STARTING was reported and initialization is under way.
    Accepted,
    /// A task was already assigned; the request was dropped.
    Ignored,
}

/// Cloneable entry point for driver callbacks (launch, kill, shutdown).
#[derive(Debug, Clone)]
pub struct ExecutorHandle {
    tx: mpsc::Sender<ExecutorEvent>,
}

impl ExecutorHandle {
    pub(crate) fn new(tx: mpsc::Sender<ExecutorEvent>) -> Self {
        Self { tx }
    }

    /// Assign the task. Resolves once STARTING has been handed to the driver.
    ///
    /// Fails with [`TaskwardenError::ExecutorStopped`] if the executor already
    /// exited (for example because its launch deadline fired).
    pub async fn launch_task(&self, descriptor: TaskDescriptor) -> Result<LaunchAck> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(ExecutorEvent::Launch {
                descriptor,
                ack: ack_tx,
            })
            .await
            .map_err(|_| TaskwardenError::ExecutorStopped)?;
        ack_rx.await.map_err(|_| TaskwardenError::ExecutorStopped)
    }

    /// Ask for the task to be killed. Kills for another task id are ignored.
    pub async fn kill_task(&self, task_id: TaskId) -> Result<()> {
        self.send(CoreEvent::KillRequested(task_id)).await
    }

    /// Executor-wide teardown: kills the current task, or stops the executor
    /// right away if no task was launched.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(CoreEvent::ShutdownRequested).await
    }

    /// Whether the executor has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, event: CoreEvent) -> Result<()> {
        if self.tx.send(ExecutorEvent::Core(event)).await.is_err() {
            debug!("executor already finished; nothing to do");
        }
        Ok(())
    }
}
