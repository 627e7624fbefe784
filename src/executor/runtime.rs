// src/executor/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{ExecutorSettings, TaskDescriptor};
use crate::driver::{Driver, StatusReporter};
use crate::health::{
    CommandHealthCheck, HealthCheck, HealthMonitor, HealthMonitorSettings, HealthVerdict,
};
use crate::runner::{RunnerFactory, TaskRunner};
use crate::types::{TaskId, TaskState};

use super::core::ExecutorCore;
use super::handle::{ExecutorHandle, LaunchAck};
use super::timer::LaunchTimer;
use super::{CoreCommand, CoreEvent, InitOutcome, init, status};

const EVENT_QUEUE_CAPACITY: usize = 64;

/// Messages consumed by the executor loop.
pub(crate) enum ExecutorEvent {
    Launch {
        descriptor: TaskDescriptor,
        ack: oneshot::Sender<LaunchAck>,
    },
    Initialized {
        runner: Option<Arc<dyn TaskRunner>>,
        outcome: InitOutcome,
    },
    Core(CoreEvent),
}

impl fmt::Debug for ExecutorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Launch { descriptor, .. } => f
                .debug_struct("Launch")
                .field("task_id", &descriptor.task_id)
                .finish_non_exhaustive(),
            Self::Initialized { runner, outcome } => f
                .debug_struct("Initialized")
                .field("has_runner", &runner.is_some())
                .field("outcome", outcome)
                .finish(),
            Self::Core(event) => f.debug_tuple("Core").field(event).finish(),
        }
    }
}

/// How the executor ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorReport {
    /// The task that was launched, if any.
    pub task_id: Option<TaskId>,
    /// Terminal status reported for it, if one was.
    pub final_state: Option<TaskState>,
}

impl ExecutorReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == Some(TaskState::Finished)
    }
}

/// Supervises one task from launch to terminal status.
///
/// This is the IO shell around [`ExecutorCore`]: it reads events from the
/// queue, feeds them to the core and performs the returned commands. It is
/// the only owner of the [`StatusReporter`], so all status updates are
/// serialized through this loop.
pub struct Executor {
    core: ExecutorCore,
    events_rx: mpsc::Receiver<ExecutorEvent>,
    events_tx: mpsc::Sender<ExecutorEvent>,
    reporter: StatusReporter,
    factory: Arc<dyn RunnerFactory>,
    clock: Arc<dyn Clock>,
    settings: ExecutorSettings,
    health_check: Option<(Arc<dyn HealthCheck>, HealthMonitorSettings)>,

    abort: CancellationToken,
    descriptor: Option<TaskDescriptor>,
    runner: Option<Arc<dyn TaskRunner>>,
    launch_timer: Option<LaunchTimer>,
    init_task: Option<JoinHandle<()>>,
    status_manager: Option<JoinHandle<()>>,
    health_stop: CancellationToken,
    health_watch: Option<JoinHandle<()>>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("core", &self.core)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(
        factory: Arc<dyn RunnerFactory>,
        driver: Arc<dyn Driver>,
        settings: ExecutorSettings,
        clock: Arc<dyn Clock>,
    ) -> (Self, ExecutorHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let handle = ExecutorHandle::new(events_tx.clone());

        let executor = Self {
            core: ExecutorCore::new(),
            events_rx,
            events_tx,
            reporter: StatusReporter::new(driver),
            factory,
            clock,
            settings,
            health_check: None,
            abort: CancellationToken::new(),
            descriptor: None,
            runner: None,
            launch_timer: None,
            init_task: None,
            status_manager: None,
            health_stop: CancellationToken::new(),
            health_watch: None,
        };
        (executor, handle)
    }

    /// Gate the task on `check` once it is running.
    ///
    /// Takes precedence over a health command in the task descriptor.
    pub fn with_health_check(
        mut self,
        check: Arc<dyn HealthCheck>,
        settings: HealthMonitorSettings,
    ) -> Self {
        self.health_check = Some((check, settings));
        self
    }

    /// Main event loop. Returns once a terminal status was reported, or the
    /// executor stopped without a task.
    ///
    /// Dropping every [`ExecutorHandle`] before a launch leaves only the
    /// launch deadline able to end the loop.
    pub async fn run(mut self) -> ExecutorReport {
        info!("taskwarden executor started");

        if let Some(deadline) = self.settings.launch_timeout {
            self.launch_timer = Some(LaunchTimer::start(
                deadline,
                Arc::clone(&self.clock),
                self.events_tx.clone(),
            ));
        }

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "executor received event");

            let (core_event, ack) = match event {
                ExecutorEvent::Launch { descriptor, ack } => {
                    (CoreEvent::LaunchRequested(descriptor), Some(ack))
                }
                ExecutorEvent::Initialized { runner, outcome } => {
                    if runner.is_some() {
                        self.runner = runner;
                    }
                    (CoreEvent::InitFinished(outcome), None)
                }
                ExecutorEvent::Core(event) => (event, None),
            };

            let step = self.core.step(core_event);
            let accepted = step
                .commands
                .iter()
                .any(|c| matches!(c, CoreCommand::BeginInitialization(_)));

            for command in step.commands {
                self.execute_command(command).await;
            }

            if let Some(ack) = ack {
                let reply = if accepted {
                    LaunchAck::Accepted
                } else {
                    LaunchAck::Ignored
                };
                let _ = ack.send(reply);
            }

            if !step.keep_running {
                info!("core requested exit; stopping executor");
                break;
            }
        }

        self.finish().await
    }

    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::CancelLaunchTimer => {
                if let Some(timer) = self.launch_timer.take() {
                    timer.cancel();
                }
            }
            CoreCommand::ReportStatus { state, message } => self.report(state, message),
            CoreCommand::BeginInitialization(descriptor) => self.begin_initialization(descriptor),
            CoreCommand::SignalAbort => self.abort.cancel(),
            CoreCommand::ForwardKill { force } => match self.runner {
                Some(ref runner) => runner.kill(force).await,
                None => warn!("kill requested but no runner exists"),
            },
            CoreCommand::StartStatusManager => self.start_status_manager(),
            CoreCommand::StartHealthMonitor => self.start_health_monitor(),
            CoreCommand::StopDriver => {
                if !self.settings.stop_wait.is_zero() && self.core.terminal_state().is_some() {
                    debug!(stop_wait = ?self.settings.stop_wait, "waiting before stopping driver");
                    self.clock.sleep(self.settings.stop_wait).await;
                }
                self.reporter.stop_driver();
            }
        }
    }

    fn report(&mut self, state: TaskState, message: Option<String>) {
        let Some(task_id) = self.core.task_id().cloned() else {
            warn!(%state, "status update without a task; dropping");
            return;
        };
        // Delivery failures are logged by the reporter; the lifecycle goes on.
        let _ = self.reporter.report(&task_id, state, message);
    }

    fn begin_initialization(&mut self, descriptor: TaskDescriptor) {
        let factory = Arc::clone(&self.factory);
        let abort = self.abort.clone();
        let clock = Arc::clone(&self.clock);
        let poll_interval = self.settings.init_poll_interval;
        let events = self.events_tx.clone();
        let task = descriptor.clone();

        self.init_task = Some(tokio::spawn(async move {
            let (runner, outcome) =
                init::initialize_task(factory, &task, abort, clock, poll_interval).await;
            let _ = events
                .send(ExecutorEvent::Initialized { runner, outcome })
                .await;
        }));
        self.descriptor = Some(descriptor);
    }

    fn start_status_manager(&mut self) {
        let Some(runner) = self.runner.clone() else {
            warn!("status manager requested but no runner exists");
            return;
        };
        self.status_manager = Some(tokio::spawn(status::watch_runner(
            runner,
            Arc::clone(&self.clock),
            self.settings.status_poll_interval,
            self.events_tx.clone(),
        )));
    }

    fn start_health_monitor(&mut self) {
        let Some((check, settings)) = self.health_source() else {
            debug!("no health check configured");
            return;
        };

        info!(interval = ?settings.interval, "starting health monitor");
        self.health_watch = Some(tokio::spawn(supervise_health(
            check,
            settings,
            Arc::clone(&self.clock),
            self.events_tx.clone(),
            self.health_stop.clone(),
        )));
    }

    fn health_source(&self) -> Option<(Arc<dyn HealthCheck>, HealthMonitorSettings)> {
        if let Some((ref check, settings)) = self.health_check {
            return Some((Arc::clone(check), settings));
        }
        let spec = self.descriptor.as_ref()?.spec.health.as_ref()?;
        let check: Arc<dyn HealthCheck> = Arc::new(CommandHealthCheck::new(spec.cmd.clone()));
        Some((check, spec.settings))
    }

    async fn finish(mut self) -> ExecutorReport {
        if let Some(timer) = self.launch_timer.take() {
            timer.cancel();
        }
        self.health_stop.cancel();

        // Each helper has either delivered its event or is about to notice
        // that the loop is gone.
        drop(self.events_rx);
        for handle in [
            self.health_watch.take(),
            self.init_task.take(),
            self.status_manager.take(),
        ]
        .into_iter()
        .flatten()
        {
            let _ = handle.await;
        }

        let report = ExecutorReport {
            task_id: self.core.task_id().cloned(),
            final_state: self.core.terminal_state(),
        };
        info!(task_id = ?report.task_id, final_state = ?report.final_state, "executor exiting");
        report
    }
}

/// Own the health monitor for the lifetime of the task.
///
/// Construction may run a check synchronously, so it happens on the blocking
/// pool where it cannot hold up kills or runner exits.
async fn supervise_health(
    check: Arc<dyn HealthCheck>,
    settings: HealthMonitorSettings,
    clock: Arc<dyn Clock>,
    events: mpsc::Sender<ExecutorEvent>,
    stop: CancellationToken,
) {
    let build = tokio::task::spawn_blocking(move || HealthMonitor::new(check, settings, clock));
    let mut monitor = tokio::select! {
        _ = stop.cancelled() => {
            debug!("executor finished before the health monitor was built");
            return;
        }
        built = build => match built {
            Ok(monitor) => monitor,
            Err(e) => {
                warn!(error = %e, "building the health monitor failed");
                return;
            }
        },
    };

    let verdicts = monitor.subscribe();
    monitor.start();

    tokio::select! {
        _ = stop.cancelled() => {}
        _ = watch_health(verdicts, events) => {}
    }
    monitor.join().await;
}

/// Forward the first unhealthy verdict to the executor.
async fn watch_health(
    mut verdicts: watch::Receiver<HealthVerdict>,
    events: mpsc::Sender<ExecutorEvent>,
) {
    let reason = match verdicts.wait_for(|v| !v.healthy).await {
        Ok(verdict) => verdict
            .failure_reason()
            .unwrap_or_else(|| "Failed health check!".to_string()),
        Err(_) => {
            debug!("health monitor stopped while healthy");
            return;
        }
    };

    let _ = events
        .send(ExecutorEvent::Core(CoreEvent::HealthDegraded(reason)))
        .await;
}
