#![allow(dead_code)]

use std::sync::Arc;

use tokio::task::JoinHandle;

use taskwarden::clock::{Clock, TokioClock};
use taskwarden::config::ExecutorSettings;
use taskwarden::executor::{Executor, ExecutorHandle, ExecutorReport};
use taskwarden_test_utils::builders::fast_settings;
use taskwarden_test_utils::{FakeBehaviour, FakeRunnerFactory, RecordingDriver, init_tracing};

/// Everything a test needs to drive one executor.
pub struct Harness {
    pub factory: Arc<FakeRunnerFactory>,
    pub driver: Arc<RecordingDriver>,
    pub handle: ExecutorHandle,
    pub executor: JoinHandle<ExecutorReport>,
}

pub fn spawn(behaviour: FakeBehaviour) -> Harness {
    spawn_with(
        FakeRunnerFactory::new(behaviour),
        RecordingDriver::new(),
        fast_settings(),
        |executor| executor,
    )
}

pub fn spawn_with(
    factory: FakeRunnerFactory,
    driver: RecordingDriver,
    settings: ExecutorSettings,
    configure: impl FnOnce(Executor) -> Executor,
) -> Harness {
    init_tracing();

    let factory = Arc::new(factory);
    let driver = Arc::new(driver);
    let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());

    let (executor, handle) = Executor::new(factory.clone(), driver.clone(), settings, clock);
    let executor = tokio::spawn(configure(executor).run());

    Harness {
        factory,
        driver,
        handle,
        executor,
    }
}
