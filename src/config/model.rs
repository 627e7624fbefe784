// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::health::HealthMonitorSettings;
use crate::types::TaskId;

/// Executor configuration as read from a TOML file.
///
/// ```toml
/// [executor]
/// launch_timeout = "10m"
/// init_poll_interval = "100ms"
/// status_poll_interval = "1s"
/// stop_wait = "0s"
/// kill_grace = "5s"
/// ```
///
/// Every key is optional. Converted into [`ExecutorSettings`] via `TryFrom`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawExecutorConfig {
    #[serde(default)]
    pub executor: RawExecutorSection,
}

/// `[executor]` section. Durations are strings like `"250ms"` or `"10m"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawExecutorSection {
    /// How long to wait for a task assignment; `"0s"` disables the timer.
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout: String,

    #[serde(default = "default_init_poll_interval")]
    pub init_poll_interval: String,

    #[serde(default = "default_status_poll_interval")]
    pub status_poll_interval: String,

    /// Delay between the terminal status update and `driver.stop()`.
    #[serde(default = "default_stop_wait")]
    pub stop_wait: String,

    /// Grace between SIGTERM and SIGKILL for non-forced kills.
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,
}

fn default_launch_timeout() -> String {
    "10m".to_string()
}

fn default_init_poll_interval() -> String {
    "100ms".to_string()
}

fn default_status_poll_interval() -> String {
    "1s".to_string()
}

fn default_stop_wait() -> String {
    "0s".to_string()
}

fn default_kill_grace() -> String {
    "5s".to_string()
}

impl Default for RawExecutorSection {
    fn default() -> Self {
        Self {
            launch_timeout: default_launch_timeout(),
            init_poll_interval: default_init_poll_interval(),
            status_poll_interval: default_status_poll_interval(),
            stop_wait: default_stop_wait(),
            kill_grace: default_kill_grace(),
        }
    }
}

/// Validated executor timing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// `None` disables the launch timer.
    pub launch_timeout: Option<Duration>,
    /// Granularity at which initialization re-checks the abort flag.
    pub init_poll_interval: Duration,
    /// How often the status manager polls the runner.
    pub status_poll_interval: Duration,
    pub stop_wait: Duration,
    pub kill_grace: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            launch_timeout: Some(Duration::from_secs(10 * 60)),
            init_poll_interval: Duration::from_millis(100),
            status_poll_interval: Duration::from_secs(1),
            stop_wait: Duration::ZERO,
            kill_grace: Duration::from_secs(5),
        }
    }
}

/// Task descriptor file as read from TOML.
///
/// ```toml
/// [task]
/// id = "hello_world-001"
/// name = "hello_world"
/// cmd = "echo hello world"
///
/// [task.health]
/// cmd = "test -f /tmp/ready"
/// interval = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskFile {
    pub task: RawTaskSection,
}

/// `[task]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskSection {
    pub id: String,

    /// Human-readable name; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    pub cmd: String,

    /// Working directory, created during initialization if missing.
    #[serde(default)]
    pub workdir: Option<PathBuf>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub health: Option<RawHealthSection>,
}

/// `[task.health]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHealthSection {
    /// Shell command; exit status 0 means healthy.
    pub cmd: String,

    #[serde(default = "default_health_interval")]
    pub interval: String,

    /// Delay before the first check; defaults to twice `interval`.
    #[serde(default)]
    pub initial_interval: Option<String>,

    #[serde(default)]
    pub max_consecutive_failures: u32,
}

fn default_health_interval() -> String {
    "30s".to_string()
}

/// A task assignment: opaque id plus what to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub task_id: TaskId,
    pub spec: TaskSpec,
}

impl TaskDescriptor {
    pub fn new(task_id: impl Into<TaskId>, spec: TaskSpec) -> Self {
        Self {
            task_id: task_id.into(),
            spec,
        }
    }
}

/// What to run for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub cmd: String,
    pub workdir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub health: Option<HealthCheckSpec>,
}

impl TaskSpec {
    /// A plain command with no workdir, env or health check.
    pub fn command(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            workdir: None,
            env: BTreeMap::new(),
            health: None,
        }
    }
}

/// Command-based health check attached to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckSpec {
    pub cmd: String,
    pub settings: HealthMonitorSettings,
}
