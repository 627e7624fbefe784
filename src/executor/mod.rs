// src/executor/mod.rs

//! Single-task executor.
//!
//! The lifecycle rules live in a pure, synchronous state machine
//! ([`core::ExecutorCore`]) that consumes [`CoreEvent`]s and returns
//! [`CoreCommand`]s. The async shell ([`runtime::Executor`]) owns the event
//! queue, runs the commands and is the only caller of the status reporter.
//!
//! Concurrent activities feed events back into the queue:
//! - [`init`]: construct the runner, initialize, start.
//! - [`status`]: status manager watching the runner until it terminates.
//! - [`timer`]: launch deadline.
//! - the health watcher started by the runtime once the task is running.
//!
//! External callers talk to the executor through an [`ExecutorHandle`].

use crate::config::TaskDescriptor;
use crate::types::{RunnerState, TaskId, TaskState};

pub mod core;
pub mod handle;
pub mod init;
pub mod runtime;
pub mod status;
pub mod timer;

pub use self::core::ExecutorCore;
pub use handle::{ExecutorHandle, LaunchAck};
pub use runtime::{Executor, ExecutorReport};
pub use timer::LaunchTimer;

/// Where the executor is in its single-task lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorPhase {
    /// Waiting for a task assignment.
    New,
    /// STARTING reported; runner being constructed, initialized, started.
    Initializing,
    /// Runner started; the status manager is watching it.
    Running,
    /// Terminal status reported (or executor shut down without a task).
    Finished,
}

/// Result of the initialization sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Started,
    /// The abort flag was observed before the task was started.
    Aborted,
    /// Runner construction, `initialize()` or `start()` failed.
    Failed(String),
}

/// Inputs to the executor state machine.
#[derive(Debug, Clone)]
pub enum CoreEvent {
    LaunchRequested(TaskDescriptor),
    KillRequested(TaskId),
    ShutdownRequested,
    LaunchDeadlineElapsed,
    InitFinished(InitOutcome),
    RunnerExited {
        state: RunnerState,
        message: Option<String>,
    },
    /// The composed health monitor latched unhealthy.
    HealthDegraded(String),
}

/// Effects the async shell must perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    CancelLaunchTimer,
    ReportStatus {
        state: TaskState,
        message: Option<String>,
    },
    BeginInitialization(TaskDescriptor),
    /// Set the abort flag read by the initialization sequence.
    SignalAbort,
    ForwardKill {
        force: bool,
    },
    StartStatusManager,
    StartHealthMonitor,
    StopDriver,
}

/// Decision returned by the core after handling one event.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the event loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn unchanged() -> Self {
        Self::continue_with(Vec::new())
    }

    pub(crate) fn stop_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}
