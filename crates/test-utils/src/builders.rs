#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use taskwarden::config::{ExecutorSettings, HealthCheckSpec, TaskDescriptor, TaskSpec};
use taskwarden::health::HealthMonitorSettings;

/// Builder for `TaskDescriptor` to simplify test setup.
pub struct TaskBuilder {
    task_id: String,
    spec: TaskSpec,
}

impl TaskBuilder {
    pub fn new(task_id: &str, cmd: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            spec: TaskSpec {
                name: task_id.to_string(),
                cmd: cmd.to_string(),
                workdir: None,
                env: BTreeMap::new(),
                health: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.spec.name = name.to_string();
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.workdir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.spec.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn health(mut self, cmd: &str, settings: HealthMonitorSettings) -> Self {
        self.spec.health = Some(HealthCheckSpec {
            cmd: cmd.to_string(),
            settings,
        });
        self
    }

    pub fn build(self) -> TaskDescriptor {
        TaskDescriptor::new(self.task_id.as_str(), self.spec)
    }
}

/// Executor settings with short polling intervals and no launch deadline.
pub fn fast_settings() -> ExecutorSettings {
    ExecutorSettings {
        launch_timeout: None,
        init_poll_interval: Duration::from_millis(5),
        status_poll_interval: Duration::from_millis(5),
        stop_wait: Duration::ZERO,
        kill_grace: Duration::from_millis(200),
    }
}
