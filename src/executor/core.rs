// src/executor/core.rs

//! Pure executor state machine.
//!
//! [`ExecutorCore`] consumes [`CoreEvent`]s and produces:
//! - an updated lifecycle phase
//! - the list of [`CoreCommand`]s the async shell must run
//!
//! It owns every "exactly once" rule of the executor: one launch, one abort
//! signal, one forwarded kill, one terminal status. It has no channels, no
//! Tokio types and does no IO, so every interleaving of events can be
//! exercised directly in tests.

use tracing::{debug, info, warn};

use crate::config::TaskDescriptor;
use crate::types::{RunnerState, TaskId, TaskState};

use super::{CoreCommand, CoreEvent, CoreStep, ExecutorPhase, InitOutcome};

#[derive(Debug)]
pub struct ExecutorCore {
    phase: ExecutorPhase,
    task_id: Option<TaskId>,
    abort_requested: bool,
    kill_forwarded: bool,
    /// Reason recorded when the health monitor asked for the kill.
    health_failure: Option<String>,
    terminal: Option<TaskState>,
}

impl Default for ExecutorCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorCore {
    pub fn new() -> Self {
        Self {
            phase: ExecutorPhase::New,
            task_id: None,
            abort_requested: false,
            kill_forwarded: false,
            health_failure: None,
            terminal: None,
        }
    }

    pub fn phase(&self) -> ExecutorPhase {
        self.phase
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    /// Terminal status reported for the task, once there is one.
    pub fn terminal_state(&self) -> Option<TaskState> {
        self.terminal
    }

    pub fn abort_requested(&self) -> bool {
        self.abort_requested
    }

    /// Handle a single event and return what the shell should do next.
    pub fn step(&mut self, event: CoreEvent) -> CoreStep {
        match event {
            CoreEvent::LaunchRequested(descriptor) => self.on_launch(descriptor),
            CoreEvent::KillRequested(task_id) => self.on_kill(task_id),
            CoreEvent::ShutdownRequested => self.on_shutdown(),
            CoreEvent::LaunchDeadlineElapsed => self.on_launch_deadline(),
            CoreEvent::InitFinished(outcome) => self.on_init_finished(outcome),
            CoreEvent::RunnerExited { state, message } => self.on_runner_exited(state, message),
            CoreEvent::HealthDegraded(reason) => self.on_health_degraded(reason),
        }
    }

    fn on_launch(&mut self, descriptor: TaskDescriptor) -> CoreStep {
        if self.phase != ExecutorPhase::New {
            warn!(
                task_id = %descriptor.task_id,
                phase = ?self.phase,
                "executor already assigned a task; ignoring launch"
            );
            return CoreStep::unchanged();
        }

        info!(task_id = %descriptor.task_id, "launching task");
        self.phase = ExecutorPhase::Initializing;
        self.task_id = Some(descriptor.task_id.clone());

        CoreStep::continue_with(vec![
            CoreCommand::CancelLaunchTimer,
            CoreCommand::ReportStatus {
                state: TaskState::Starting,
                message: None,
            },
            CoreCommand::BeginInitialization(descriptor),
        ])
    }

    fn on_kill(&mut self, task_id: TaskId) -> CoreStep {
        if self.task_id.as_ref() != Some(&task_id) {
            warn!(task_id = %task_id, current = ?self.task_id, "kill for unknown task; ignoring");
            return CoreStep::unchanged();
        }
        self.cancel_current()
    }

    fn on_shutdown(&mut self) -> CoreStep {
        if self.phase == ExecutorPhase::New {
            info!("shutdown requested before any task was launched");
            self.phase = ExecutorPhase::Finished;
            return CoreStep::stop_with(vec![
                CoreCommand::CancelLaunchTimer,
                CoreCommand::StopDriver,
            ]);
        }
        self.cancel_current()
    }

    fn on_launch_deadline(&mut self) -> CoreStep {
        if self.phase != ExecutorPhase::New {
            debug!(phase = ?self.phase, "launch deadline elapsed after launch; ignoring");
            return CoreStep::unchanged();
        }

        warn!("no task launched before the deadline; stopping executor");
        self.phase = ExecutorPhase::Finished;
        CoreStep::stop_with(vec![CoreCommand::StopDriver])
    }

    /// Kill/shutdown semantics for whatever the current phase is.
    fn cancel_current(&mut self) -> CoreStep {
        match self.phase {
            ExecutorPhase::Initializing => {
                if self.abort_requested {
                    debug!("abort already requested");
                    return CoreStep::unchanged();
                }
                info!("kill requested during initialization; aborting");
                self.abort_requested = true;
                CoreStep::continue_with(vec![CoreCommand::SignalAbort])
            }
            ExecutorPhase::Running => CoreStep::continue_with(self.forward_kill(false)),
            ExecutorPhase::New | ExecutorPhase::Finished => {
                debug!(phase = ?self.phase, "nothing to kill");
                CoreStep::unchanged()
            }
        }
    }

    fn forward_kill(&mut self, force: bool) -> Vec<CoreCommand> {
        if self.kill_forwarded {
            debug!("kill already forwarded to runner");
            return Vec::new();
        }
        self.kill_forwarded = true;
        vec![CoreCommand::ForwardKill { force }]
    }

    fn on_init_finished(&mut self, outcome: InitOutcome) -> CoreStep {
        if self.phase != ExecutorPhase::Initializing {
            warn!(phase = ?self.phase, ?outcome, "unexpected initialization result; ignoring");
            return CoreStep::unchanged();
        }

        match outcome {
            InitOutcome::Started if self.abort_requested => {
                // The kill raced with start(); never report RUNNING, let the
                // status manager observe the runner going down.
                info!("task started after abort was requested; killing it");
                self.phase = ExecutorPhase::Running;
                let mut commands = vec![CoreCommand::StartStatusManager];
                commands.extend(self.forward_kill(true));
                CoreStep::continue_with(commands)
            }
            InitOutcome::Started => {
                self.phase = ExecutorPhase::Running;
                CoreStep::continue_with(vec![
                    CoreCommand::ReportStatus {
                        state: TaskState::Running,
                        message: None,
                    },
                    CoreCommand::StartStatusManager,
                    CoreCommand::StartHealthMonitor,
                ])
            }
            InitOutcome::Aborted => self.terminate(
                TaskState::Killed,
                Some("killed during initialization".to_string()),
            ),
            InitOutcome::Failed(reason) => self.terminate(TaskState::Failed, Some(reason)),
        }
    }

    fn on_runner_exited(&mut self, state: RunnerState, message: Option<String>) -> CoreStep {
        if self.phase != ExecutorPhase::Running {
            warn!(phase = ?self.phase, ?state, "runner exit outside of running phase; ignoring");
            return CoreStep::unchanged();
        }
        if !state.is_terminal() {
            debug!("runner still running; ignoring");
            return CoreStep::unchanged();
        }

        match (state, self.health_failure.take()) {
            (RunnerState::Killed, Some(reason)) => self.terminate(TaskState::Failed, Some(reason)),
            (state, _) => self.terminate(state.into(), message),
        }
    }

    fn on_health_degraded(&mut self, reason: String) -> CoreStep {
        if self.phase != ExecutorPhase::Running || self.kill_forwarded {
            debug!(phase = ?self.phase, %reason, "health degraded but task already going down");
            return CoreStep::unchanged();
        }

        warn!(%reason, "task unhealthy; killing it");
        self.health_failure = Some(reason);
        CoreStep::continue_with(self.forward_kill(false))
    }

    fn terminate(&mut self, state: TaskState, message: Option<String>) -> CoreStep {
        info!(task_id = ?self.task_id, %state, ?message, "task reached terminal state");
        self.phase = ExecutorPhase::Finished;
        self.terminal = Some(state);
        CoreStep::stop_with(vec![
            CoreCommand::ReportStatus { state, message },
            CoreCommand::StopDriver,
        ])
    }
}
