// tests/launch_timer.rs

mod common;
use crate::common::spawn_with;

use std::sync::Arc;
use std::time::Duration;

use taskwarden::clock::mock::ManualClock;
use taskwarden::errors::TaskwardenError;
use taskwarden::executor::Executor;
use taskwarden::types::TaskState;
use taskwarden_test_utils::builders::{TaskBuilder, fast_settings};
use taskwarden_test_utils::{
    FakeBehaviour, FakeRunnerFactory, RecordingDriver, init_tracing, with_timeout,
};

#[tokio::test]
async fn executor_without_task_stops_at_deadline() {
    init_tracing();
    let clock = ManualClock::new();
    let driver = Arc::new(RecordingDriver::new());
    let settings = taskwarden::config::ExecutorSettings {
        launch_timeout: Some(Duration::from_secs(600)),
        ..fast_settings()
    };

    let (executor, handle) = Executor::new(
        Arc::new(FakeRunnerFactory::new(FakeBehaviour::Normal)),
        driver.clone(),
        settings,
        Arc::new(clock.clone()),
    );
    let executor = tokio::spawn(executor.run());

    with_timeout(clock.wait_for_sleepers(1)).await;
    clock.advance(Duration::from_secs(599));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!driver.is_stopped());

    clock.advance(Duration::from_secs(1));
    let report = with_timeout(executor).await.unwrap();

    assert_eq!(report.task_id, None);
    assert_eq!(report.final_state, None);
    assert!(driver.updates().is_empty());
    assert!(driver.is_stopped());

    let err = handle
        .launch_task(TaskBuilder::new("late", "true").build())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskwardenError::ExecutorStopped));
}

#[tokio::test]
async fn launch_cancels_the_deadline() {
    let settings = taskwarden::config::ExecutorSettings {
        launch_timeout: Some(Duration::from_millis(50)),
        ..fast_settings()
    };
    let h = spawn_with(
        FakeRunnerFactory::new(FakeBehaviour::Normal),
        RecordingDriver::new(),
        settings,
        |executor| executor,
    );
    h.handle
        .launch_task(TaskBuilder::new("t-1", "true").build())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!h.driver.is_stopped());
    assert_eq!(
        h.driver.states(),
        vec![TaskState::Starting, TaskState::Running]
    );

    h.factory.runner().unwrap().finish();
    let report = with_timeout(h.executor).await.unwrap();
    assert_eq!(report.final_state, Some(TaskState::Finished));
}

#[tokio::test]
async fn driver_stop_waits_for_stop_wait() {
    let settings = taskwarden::config::ExecutorSettings {
        stop_wait: Duration::from_millis(200),
        ..fast_settings()
    };
    let h = spawn_with(
        FakeRunnerFactory::new(FakeBehaviour::Normal),
        RecordingDriver::new(),
        settings,
        |executor| executor,
    );
    h.handle
        .launch_task(TaskBuilder::new("t-1", "true").build())
        .await
        .unwrap();

    let runner = with_timeout(h.factory.wait_for_runner()).await;
    with_timeout(h.driver.wait_for_state(TaskState::Running)).await;
    runner.finish();

    with_timeout(h.driver.wait_for_state(TaskState::Finished)).await;
    assert!(!h.driver.is_stopped());

    with_timeout(h.driver.wait_stopped()).await;
    with_timeout(h.executor).await.unwrap();
}
