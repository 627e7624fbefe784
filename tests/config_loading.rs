// tests/config_loading.rs

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;

use taskwarden::config::{ExecutorSettings, load_settings, load_task, parse_settings, parse_task};
use taskwarden::errors::TaskwardenError;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const TASK_TOML: &str = r#"
[task]
id = "hello_world-001"
name = "hello_world"
cmd = "echo hello world"
workdir = "/tmp/hello"

[task.env]
GREETING = "hi"

[task.health]
cmd = "test -f /tmp/ready"
interval = "15s"
max_consecutive_failures = 2
"#;

#[test]
fn loads_task_descriptor_from_disk() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("task.toml");
    fs::write(&path, TASK_TOML)?;

    let task = load_task(&path)?;
    assert_eq!(task.task_id.as_str(), "hello_world-001");
    assert_eq!(task.spec.name, "hello_world");
    assert_eq!(task.spec.cmd, "echo hello world");
    assert_eq!(task.spec.workdir, Some(PathBuf::from("/tmp/hello")));
    assert_eq!(task.spec.env.get("GREETING").map(String::as_str), Some("hi"));

    let health = task.spec.health.expect("health section");
    assert_eq!(health.cmd, "test -f /tmp/ready");
    assert_eq!(health.settings.interval, Duration::from_secs(15));
    assert_eq!(health.settings.initial_interval, None);
    assert_eq!(
        health.settings.effective_initial_interval(),
        Duration::from_secs(30)
    );
    assert_eq!(health.settings.max_consecutive_failures, 2);
    Ok(())
}

#[test]
fn name_defaults_to_task_id() -> TestResult {
    let task = parse_task(
        r#"
        [task]
        id = "t-1"
        cmd = "true"
        "#,
    )?;
    assert_eq!(task.spec.name, "t-1");
    assert!(task.spec.health.is_none());
    Ok(())
}

#[test]
fn empty_task_id_is_rejected() {
    let err = parse_task(
        r#"
        [task]
        id = "  "
        cmd = "true"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskwardenError::ConfigError(_)));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let err = parse_task("[task\nid = 1").unwrap_err();
    assert!(matches!(err, TaskwardenError::TomlError(_)));
}

#[test]
fn missing_task_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = load_task(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, TaskwardenError::IoError(_)));
}

#[test]
fn bad_health_interval_is_rejected() {
    let err = parse_task(
        r#"
        [task]
        id = "t-1"
        cmd = "true"

        [task.health]
        cmd = "true"
        interval = "soon"
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("task.health.interval"));
}

#[test]
fn settings_default_without_a_file() -> TestResult {
    assert_eq!(load_settings(None)?, ExecutorSettings::default());
    Ok(())
}

#[test]
fn settings_file_overrides_defaults() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("executor.toml");
    fs::write(
        &path,
        r#"
        [executor]
        launch_timeout = "0s"
        status_poll_interval = "250ms"
        stop_wait = "2s"
        "#,
    )?;

    let settings = load_settings(Some(&path))?;
    assert_eq!(settings.launch_timeout, None);
    assert_eq!(settings.status_poll_interval, Duration::from_millis(250));
    assert_eq!(settings.stop_wait, Duration::from_secs(2));
    assert_eq!(settings.init_poll_interval, Duration::from_millis(100));
    assert_eq!(settings.kill_grace, Duration::from_secs(5));
    Ok(())
}

#[test]
fn zero_poll_interval_is_rejected() {
    let err = parse_settings(
        r#"
        [executor]
        init_poll_interval = "0ms"
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("executor.init_poll_interval"));
}
