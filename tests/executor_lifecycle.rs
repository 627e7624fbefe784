// tests/executor_lifecycle.rs

mod common;
use crate::common::{spawn, spawn_with};

use taskwarden::executor::LaunchAck;
use taskwarden::types::TaskState;
use taskwarden_test_utils::builders::{TaskBuilder, fast_settings};
use taskwarden_test_utils::{FakeBehaviour, FakeRunnerFactory, RecordingDriver, with_timeout};

#[tokio::test]
async fn task_runs_to_completion() {
    let h = spawn(FakeBehaviour::Normal);

    let ack = h
        .handle
        .launch_task(TaskBuilder::new("hello_world-001", "echo hi").build())
        .await
        .unwrap();
    assert_eq!(ack, LaunchAck::Accepted);

    let runner = with_timeout(h.factory.wait_for_runner()).await;
    with_timeout(h.driver.wait_for_state(TaskState::Running)).await;
    runner.finish();

    let report = with_timeout(h.executor).await.unwrap();
    assert_eq!(
        h.driver.states(),
        vec![TaskState::Starting, TaskState::Running, TaskState::Finished]
    );
    assert!(h.driver.is_stopped());
    assert!(report.succeeded());
    assert_eq!(report.task_id.unwrap().as_str(), "hello_world-001");
    assert_eq!(runner.start_calls(), 1);
    assert_eq!(runner.kill_calls(), 0);
}

#[tokio::test]
async fn every_update_carries_the_task_id() {
    let h = spawn(FakeBehaviour::Normal);
    h.handle
        .launch_task(TaskBuilder::new("t-42", "true").build())
        .await
        .unwrap();

    let runner = with_timeout(h.factory.wait_for_runner()).await;
    with_timeout(h.driver.wait_for_state(TaskState::Running)).await;
    runner.finish();
    with_timeout(h.executor).await.unwrap();

    let updates = h.driver.updates();
    assert_eq!(updates.len(), 3);
    assert!(updates.iter().all(|u| u.task_id.as_str() == "t-42"));
}

#[tokio::test]
async fn runner_killed_out_of_band_is_reported_lost() {
    let h = spawn(FakeBehaviour::Normal);
    h.handle
        .launch_task(TaskBuilder::new("t-1", "sleep 60").build())
        .await
        .unwrap();

    let runner = with_timeout(h.factory.wait_for_runner()).await;
    with_timeout(h.driver.wait_for_state(TaskState::Running)).await;
    runner.vanish();

    let report = with_timeout(h.executor).await.unwrap();
    assert_eq!(
        h.driver.states(),
        vec![TaskState::Starting, TaskState::Running, TaskState::Lost]
    );
    assert_eq!(report.final_state, Some(TaskState::Lost));
    assert!(!report.succeeded());
    assert!(h.driver.is_stopped());
}

#[tokio::test]
async fn failed_exit_keeps_runner_message() {
    let h = spawn(FakeBehaviour::Normal);
    h.handle
        .launch_task(TaskBuilder::new("t-1", "exit 3").build())
        .await
        .unwrap();

    let runner = with_timeout(h.factory.wait_for_runner()).await;
    with_timeout(h.driver.wait_for_state(TaskState::Running)).await;
    runner.fail("exited with code 3");
    with_timeout(h.executor).await.unwrap();

    let last = h.driver.updates().pop().unwrap();
    assert_eq!(last.state, TaskState::Failed);
    assert_eq!(last.message.as_deref(), Some("exited with code 3"));
}

#[tokio::test]
async fn failing_start_reports_failed_and_stops_driver() {
    let h = spawn(FakeBehaviour::FailStart);
    h.handle
        .launch_task(TaskBuilder::new("t-1", "true").build())
        .await
        .unwrap();

    let report = with_timeout(h.executor).await.unwrap();
    let updates = h.driver.updates();
    assert_eq!(
        updates.iter().map(|u| u.state).collect::<Vec<_>>(),
        vec![TaskState::Starting, TaskState::Failed]
    );
    assert!(
        updates[1]
            .message
            .as_deref()
            .is_some_and(|m| m.contains("command not found"))
    );
    assert!(h.driver.is_stopped());
    assert_eq!(report.final_state, Some(TaskState::Failed));
}

#[tokio::test]
async fn failing_initialize_never_starts_the_task() {
    let h = spawn(FakeBehaviour::FailInitialize);
    h.handle
        .launch_task(TaskBuilder::new("t-1", "true").build())
        .await
        .unwrap();

    with_timeout(h.executor).await.unwrap();
    assert_eq!(
        h.driver.states(),
        vec![TaskState::Starting, TaskState::Failed]
    );
    assert!(h.driver.is_stopped());
    assert_eq!(h.factory.runner().unwrap().start_calls(), 0);
}

#[tokio::test]
async fn failing_runner_construction_reports_failed() {
    let h = spawn_with(
        FakeRunnerFactory::failing("no such sandbox"),
        RecordingDriver::new(),
        fast_settings(),
        |executor| executor,
    );
    h.handle
        .launch_task(TaskBuilder::new("t-1", "true").build())
        .await
        .unwrap();

    with_timeout(h.executor).await.unwrap();
    let updates = h.driver.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].state, TaskState::Failed);
    assert!(
        updates[1]
            .message
            .as_deref()
            .is_some_and(|m| m.contains("no such sandbox"))
    );
}

#[tokio::test]
async fn second_launch_is_ignored() {
    let h = spawn(FakeBehaviour::Normal);
    let first = h
        .handle
        .launch_task(TaskBuilder::new("t-1", "true").build())
        .await
        .unwrap();
    let second = h
        .handle
        .launch_task(TaskBuilder::new("t-2", "true").build())
        .await
        .unwrap();
    assert_eq!(first, LaunchAck::Accepted);
    assert_eq!(second, LaunchAck::Ignored);

    let runner = with_timeout(h.factory.wait_for_runner()).await;
    with_timeout(h.driver.wait_for_state(TaskState::Running)).await;
    runner.finish();

    let report = with_timeout(h.executor).await.unwrap();
    assert_eq!(report.task_id.unwrap().as_str(), "t-1");
    assert_eq!(h.driver.updates().len(), 3);
}

#[tokio::test]
async fn delivery_failures_do_not_stall_the_lifecycle() {
    let h = spawn_with(
        FakeRunnerFactory::new(FakeBehaviour::Normal),
        RecordingDriver::failing(),
        fast_settings(),
        |executor| executor,
    );
    h.handle
        .launch_task(TaskBuilder::new("t-1", "true").build())
        .await
        .unwrap();

    let runner = with_timeout(h.factory.wait_for_runner()).await;
    with_timeout(h.driver.wait_for_state(TaskState::Running)).await;
    runner.finish();

    let report = with_timeout(h.executor).await.unwrap();
    assert_eq!(report.final_state, Some(TaskState::Finished));
    assert_eq!(
        h.driver.states(),
        vec![TaskState::Starting, TaskState::Running, TaskState::Finished]
    );
    assert!(h.driver.is_stopped());
}
