// src/runner/process.rs

//! Runner that executes the task command as a local child process.

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{TaskDescriptor, TaskSpec};
use crate::types::{RunnerState, TaskId};

use super::{RunnerFactory, RunnerFuture, TaskError, TaskRunner};

/// Creates a [`ProcessTaskRunner`] per task.
#[derive(Debug, Clone)]
pub struct ProcessRunnerFactory {
    kill_grace: Duration,
    clock: Arc<dyn Clock>,
}

impl ProcessRunnerFactory {
    pub fn new(kill_grace: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { kill_grace, clock }
    }
}

impl RunnerFactory for ProcessRunnerFactory {
    fn create(&self, descriptor: &TaskDescriptor) -> Result<Arc<dyn TaskRunner>, TaskError> {
        Ok(Arc::new(ProcessTaskRunner::new(
            descriptor.task_id.clone(),
            descriptor.spec.clone(),
            self.kill_grace,
            Arc::clone(&self.clock),
        )))
    }
}

#[derive(Debug, Clone)]
struct TerminalRecord {
    state: RunnerState,
    message: Option<String>,
}

/// Runs `sh -c <cmd>` and records how it ended.
///
/// - exit 0 → `Finished`
/// - non-zero exit or wait error → `Failed`
/// - a kill requested through [`TaskRunner::kill`] → `Killed`
/// - death by a signal we did not send → `Lost`
pub struct ProcessTaskRunner {
    task_id: TaskId,
    spec: TaskSpec,
    kill_grace: Duration,
    clock: Arc<dyn Clock>,
    initialized: AtomicBool,
    started: AtomicBool,
    record: Arc<Mutex<TerminalRecord>>,
    /// Taken by the first `kill`; `Some(force)` travels to the supervisor.
    kill_tx: Mutex<Option<oneshot::Sender<bool>>>,
}

impl ProcessTaskRunner {
    pub fn new(task_id: TaskId, spec: TaskSpec, kill_grace: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            task_id,
            spec,
            kill_grace,
            clock,
            initialized: AtomicBool::new(false),
            started: AtomicBool::new(false),
            record: Arc::new(Mutex::new(TerminalRecord {
                state: RunnerState::Running,
                message: None,
            })),
            kill_tx: Mutex::new(None),
        }
    }

    fn build_command(&self) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.spec.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.spec.cmd);
            c
        };

        cmd.envs(&self.spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.spec.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl TaskRunner for ProcessTaskRunner {
    fn initialize(&self) -> RunnerFuture<'_, Result<(), TaskError>> {
        Box::pin(async move {
            if let Some(ref dir) = self.spec.workdir {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    TaskError::Initialize(format!("creating workdir {:?}: {}", dir, e))
                })?;
            }
            self.initialized.store(true, Ordering::SeqCst);
            debug!(task_id = %self.task_id, "process runner initialized");
            Ok(())
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn start(&self) -> RunnerFuture<'_, Result<(), TaskError>> {
        Box::pin(async move {
            if !self.is_initialized() {
                return Err(TaskError::NotInitialized);
            }
            if self.started.swap(true, Ordering::SeqCst) {
                return Err(TaskError::AlreadyStarted);
            }

            info!(
                task_id = %self.task_id,
                name = %self.spec.name,
                cmd = %self.spec.cmd,
                "starting task process"
            );

            let mut child = self.build_command().spawn()?;

            if let Some(stdout) = child.stdout.take() {
                drain_lines(self.task_id.clone(), "stdout", stdout);
            }
            if let Some(stderr) = child.stderr.take() {
                drain_lines(self.task_id.clone(), "stderr", stderr);
            }

            let (kill_tx, kill_rx) = oneshot::channel::<bool>();
            *self.kill_tx.lock().unwrap_or_else(|p| p.into_inner()) = Some(kill_tx);

            tokio::spawn(supervise(
                child,
                kill_rx,
                Arc::clone(&self.record),
                self.task_id.clone(),
                self.kill_grace,
                Arc::clone(&self.clock),
            ));

            Ok(())
        })
    }

    fn poll_terminal_state(&self) -> RunnerState {
        self.record.lock().unwrap_or_else(|p| p.into_inner()).state
    }

    fn terminal_message(&self) -> Option<String> {
        self.record
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .message
            .clone()
    }

    fn kill(&self, force: bool) -> RunnerFuture<'_, ()> {
        let sender = self.kill_tx.lock().unwrap_or_else(|p| p.into_inner()).take();
        match sender {
            Some(tx) => {
                info!(task_id = %self.task_id, force, "delivering kill to task process");
                if tx.send(force).is_err() {
                    debug!(task_id = %self.task_id, "task process already exited before kill");
                }
            }
            None => {
                debug!(
                    task_id = %self.task_id,
                    "kill already delivered or process never started; ignoring"
                );
            }
        }
        Box::pin(async {})
    }
}

/// Log a child stream line by line so pipes never fill up.
fn drain_lines<R>(task_id: TaskId, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task_id = %task_id, stream, "{}", line);
        }
    });
}

/// Wait for the child to exit, or kill it on request, then record the
/// terminal state.
async fn supervise(
    mut child: Child,
    kill_rx: oneshot::Receiver<bool>,
    record: Arc<Mutex<TerminalRecord>>,
    task_id: TaskId,
    kill_grace: Duration,
    clock: Arc<dyn Clock>,
) {
    // An exit that already happened wins over a kill that arrives with it.
    let terminal = tokio::select! {
        biased;
        status = child.wait() => classify(&task_id, status),
        request = kill_rx => match request {
            Ok(force) => {
                deliver_kill(&mut child, &task_id, force, kill_grace, clock.as_ref()).await;
                let message = if force { "killed (forced)" } else { "killed" };
                TerminalRecord {
                    state: RunnerState::Killed,
                    message: Some(message.to_string()),
                }
            }
            // Runner dropped without killing; keep watching the process.
            Err(_) => classify(&task_id, child.wait().await),
        },
    };

    info!(task_id = %task_id, state = ?terminal.state, "task process terminated");
    *record.lock().unwrap_or_else(|p| p.into_inner()) = terminal;
}

async fn deliver_kill(
    child: &mut Child,
    task_id: &TaskId,
    force: bool,
    kill_grace: Duration,
    clock: &dyn Clock,
) {
    if !force && send_sigterm(child) {
        tokio::select! {
            _ = child.wait() => return,
            _ = clock.sleep(kill_grace) => {
                warn!(task_id = %task_id, ?kill_grace, "task ignored SIGTERM; escalating to SIGKILL");
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(task_id = %task_id, error = %e, "failed to kill task process");
    }
}

#[cfg(unix)]
fn send_sigterm(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    // SAFETY: plain signal delivery to a pid we spawned and have not reaped.
    unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) -> bool {
    false
}

fn classify(task_id: &TaskId, status: std::io::Result<ExitStatus>) -> TerminalRecord {
    match status {
        Ok(status) if status.success() => TerminalRecord {
            state: RunnerState::Finished,
            message: None,
        },
        Ok(status) => match status.code() {
            Some(code) => TerminalRecord {
                state: RunnerState::Failed,
                message: Some(format!("exited with code {}", code)),
            },
            None => {
                warn!(task_id = %task_id, %status, "task process terminated out of band");
                TerminalRecord {
                    state: RunnerState::Lost,
                    message: Some(format!("process disappeared: {}", status)),
                }
            }
        },
        Err(e) => {
            error!(task_id = %task_id, error = %e, "waiting for task process failed");
            TerminalRecord {
                state: RunnerState::Failed,
                message: Some(format!("wait failed: {}", e)),
            }
        }
    }
}
