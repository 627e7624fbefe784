use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use taskwarden::config::TaskDescriptor;
use taskwarden::runner::{RunnerFactory, RunnerFuture, TaskError, TaskRunner};
use taskwarden::types::RunnerState;

/// How a [`FakeTaskRunner`] behaves during initialization and start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// Initializes and starts immediately.
    Normal,
    /// `initialize()` returns an error.
    FailInitialize,
    /// `start()` returns an error.
    FailStart,
    /// `initialize()` returns at once but `is_initialized()` stays false
    /// until [`FakeTaskRunner::release_init`].
    SlowInitialize,
    /// `initialize()` itself does not return until
    /// [`FakeTaskRunner::release_init`].
    BlockingInitialize,
}

/// A task runner driven by the test:
/// - records calls to `start` and `kill`
/// - stays `Running` until the test calls `finish`, `fail` or `vanish`,
///   or until it is killed.
pub struct FakeTaskRunner {
    behaviour: FakeBehaviour,
    released: watch::Sender<bool>,
    initialized: AtomicBool,
    started: watch::Sender<bool>,
    start_calls: AtomicUsize,
    kill_calls: AtomicUsize,
    last_kill_force: Mutex<Option<bool>>,
    terminal: Mutex<(RunnerState, Option<String>)>,
}

impl FakeTaskRunner {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        let (released, _) = watch::channel(false);
        let (started, _) = watch::channel(false);
        Self {
            behaviour,
            released,
            initialized: AtomicBool::new(false),
            started,
            start_calls: AtomicUsize::new(0),
            kill_calls: AtomicUsize::new(0),
            last_kill_force: Mutex::new(None),
            terminal: Mutex::new((RunnerState::Running, None)),
        }
    }

    /// Let a slow or blocking initialization complete.
    pub fn release_init(&self) {
        self.released.send_replace(true);
    }

    /// The process exits with status 0.
    pub fn finish(&self) {
        self.set_terminal(RunnerState::Finished, None);
    }

    /// The process exits with an error.
    pub fn fail(&self, message: &str) {
        self.set_terminal(RunnerState::Failed, Some(message.to_string()));
    }

    /// The process is killed out of band (e.g. SIGKILL by someone else).
    pub fn vanish(&self) {
        self.set_terminal(RunnerState::Lost, Some("process disappeared".to_string()));
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn kill_calls(&self) -> usize {
        self.kill_calls.load(Ordering::SeqCst)
    }

    pub fn last_kill_force(&self) -> Option<bool> {
        *self.last_kill_force.lock().unwrap()
    }

    /// Resolve once `start()` succeeded.
    pub async fn wait_started(&self) {
        let mut rx = self.started.subscribe();
        let _ = rx.wait_for(|started| *started).await;
    }

    fn set_terminal(&self, state: RunnerState, message: Option<String>) {
        let mut terminal = self.terminal.lock().unwrap();
        if terminal.0 == RunnerState::Running {
            *terminal = (state, message);
        }
    }

    async fn wait_released(&self) {
        let mut rx = self.released.subscribe();
        let _ = rx.wait_for(|released| *released).await;
    }
}

impl TaskRunner for FakeTaskRunner {
    fn initialize(&self) -> RunnerFuture<'_, Result<(), TaskError>> {
        Box::pin(async move {
            match self.behaviour {
                FakeBehaviour::FailInitialize => {
                    return Err(TaskError::Initialize("sandbox unavailable".to_string()));
                }
                FakeBehaviour::SlowInitialize => return Ok(()),
                FakeBehaviour::BlockingInitialize => self.wait_released().await,
                FakeBehaviour::Normal | FakeBehaviour::FailStart => {}
            }
            self.initialized.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn is_initialized(&self) -> bool {
        match self.behaviour {
            FakeBehaviour::SlowInitialize => *self.released.borrow(),
            _ => self.initialized.load(Ordering::SeqCst),
        }
    }

    fn start(&self) -> RunnerFuture<'_, Result<(), TaskError>> {
        Box::pin(async move {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            if self.behaviour == FakeBehaviour::FailStart {
                return Err(TaskError::Start("command not found".to_string()));
            }
            self.started.send_replace(true);
            Ok(())
        })
    }

    fn poll_terminal_state(&self) -> RunnerState {
        self.terminal.lock().unwrap().0
    }

    fn terminal_message(&self) -> Option<String> {
        self.terminal.lock().unwrap().1.clone()
    }

    fn kill(&self, force: bool) -> RunnerFuture<'_, ()> {
        self.kill_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_kill_force.lock().unwrap() = Some(force);
        if *self.started.borrow() {
            self.set_terminal(RunnerState::Killed, Some("killed".to_string()));
        }
        Box::pin(async {})
    }
}

/// Factory handing out one [`FakeTaskRunner`] and exposing it to the test.
pub struct FakeRunnerFactory {
    behaviour: FakeBehaviour,
    fail_create: Option<String>,
    created: watch::Sender<Option<Arc<FakeTaskRunner>>>,
}

impl FakeRunnerFactory {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        let (created, _) = watch::channel(None);
        Self {
            behaviour,
            fail_create: None,
            created,
        }
    }

    /// A factory whose `create` always fails.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_create: Some(message.to_string()),
            ..Self::new(FakeBehaviour::Normal)
        }
    }

    /// The runner, if one was created.
    pub fn runner(&self) -> Option<Arc<FakeTaskRunner>> {
        self.created.borrow().clone()
    }

    /// Resolve with the runner once the executor created it.
    pub async fn wait_for_runner(&self) -> Arc<FakeTaskRunner> {
        let mut rx = self.created.subscribe();
        let runner = rx
            .wait_for(|r| r.is_some())
            .await
            .expect("factory dropped")
            .clone();
        runner.expect("runner present")
    }
}

impl RunnerFactory for FakeRunnerFactory {
    fn create(&self, _descriptor: &TaskDescriptor) -> Result<Arc<dyn TaskRunner>, TaskError> {
        if let Some(ref message) = self.fail_create {
            return Err(TaskError::Start(message.clone()));
        }
        let runner = Arc::new(FakeTaskRunner::new(self.behaviour));
        self.created.send_replace(Some(Arc::clone(&runner)));
        Ok(runner)
    }
}
