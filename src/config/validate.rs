// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ExecutorSettings, HealthCheckSpec, RawExecutorConfig, RawHealthSection, RawTaskFile,
    TaskDescriptor, TaskSpec,
};
use crate::errors::{Result, TaskwardenError};
use crate::health::HealthMonitorSettings;
use crate::types::TaskId;

impl TryFrom<RawExecutorConfig> for ExecutorSettings {
    type Error = TaskwardenError;

    fn try_from(raw: RawExecutorConfig) -> std::result::Result<Self, Self::Error> {
        let section = raw.executor;

        let launch_timeout = duration_field("executor.launch_timeout", &section.launch_timeout)?;
        let init_poll_interval =
            non_zero_duration_field("executor.init_poll_interval", &section.init_poll_interval)?;
        let status_poll_interval = non_zero_duration_field(
            "executor.status_poll_interval",
            &section.status_poll_interval,
        )?;
        let stop_wait = duration_field("executor.stop_wait", &section.stop_wait)?;
        let kill_grace = duration_field("executor.kill_grace", &section.kill_grace)?;

        Ok(ExecutorSettings {
            launch_timeout: (!launch_timeout.is_zero()).then_some(launch_timeout),
            init_poll_interval,
            status_poll_interval,
            stop_wait,
            kill_grace,
        })
    }
}

impl TryFrom<RawTaskFile> for TaskDescriptor {
    type Error = TaskwardenError;

    fn try_from(raw: RawTaskFile) -> std::result::Result<Self, Self::Error> {
        let task = raw.task;

        let id = task.id.trim();
        if id.is_empty() {
            return Err(TaskwardenError::ConfigError(
                "[task].id must not be empty".to_string(),
            ));
        }
        if task.cmd.trim().is_empty() {
            return Err(TaskwardenError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                id
            )));
        }

        let health = task
            .health
            .map(|h| validate_health(id, h))
            .transpose()?;

        let name = task
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| id.to_string());

        Ok(TaskDescriptor {
            task_id: TaskId::new(id),
            spec: TaskSpec {
                name,
                cmd: task.cmd,
                workdir: task.workdir,
                env: task.env,
                health,
            },
        })
    }
}

fn validate_health(task_id: &str, raw: RawHealthSection) -> Result<HealthCheckSpec> {
    if raw.cmd.trim().is_empty() {
        return Err(TaskwardenError::ConfigError(format!(
            "task '{}' has an empty [task.health].cmd",
            task_id
        )));
    }

    let interval = non_zero_duration_field("task.health.interval", &raw.interval)?;
    let initial_interval = raw
        .initial_interval
        .as_deref()
        .map(|s| duration_field("task.health.initial_interval", s))
        .transpose()?;

    Ok(HealthCheckSpec {
        cmd: raw.cmd,
        settings: HealthMonitorSettings {
            interval,
            initial_interval,
            max_consecutive_failures: raw.max_consecutive_failures,
        },
    })
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| TaskwardenError::ConfigError(format!("invalid `{}`: {}", field, e)))
}

fn non_zero_duration_field(field: &str, value: &str) -> Result<Duration> {
    let d = duration_field(field, value)?;
    if d.is_zero() {
        return Err(TaskwardenError::ConfigError(format!(
            "`{}` must be greater than zero",
            field
        )));
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{RawExecutorSection, RawTaskSection};
    use std::collections::BTreeMap;

    fn raw_task(id: &str, cmd: &str) -> RawTaskFile {
        RawTaskFile {
            task: RawTaskSection {
                id: id.to_string(),
                name: None,
                cmd: cmd.to_string(),
                workdir: None,
                env: BTreeMap::new(),
                health: None,
            },
        }
    }

    #[test]
    fn default_executor_section_matches_default_settings() {
        let settings = ExecutorSettings::try_from(RawExecutorConfig::default()).unwrap();
        assert_eq!(settings, ExecutorSettings::default());
    }

    #[test]
    fn zero_launch_timeout_disables_timer() {
        let raw = RawExecutorConfig {
            executor: RawExecutorSection {
                launch_timeout: "0s".to_string(),
                ..RawExecutorSection::default()
            },
        };
        let settings = ExecutorSettings::try_from(raw).unwrap();
        assert_eq!(settings.launch_timeout, None);
    }

    #[test]
    fn zero_status_poll_interval_is_rejected() {
        let raw = RawExecutorConfig {
            executor: RawExecutorSection {
                status_poll_interval: "0ms".to_string(),
                ..RawExecutorSection::default()
            },
        };
        match ExecutorSettings::try_from(raw) {
            Err(TaskwardenError::ConfigError(msg)) => {
                assert!(msg.contains("status_poll_interval"))
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn task_name_defaults_to_id() {
        let descriptor = TaskDescriptor::try_from(raw_task("sleep60-001", "sleep 60")).unwrap();
        assert_eq!(descriptor.task_id.as_str(), "sleep60-001");
        assert_eq!(descriptor.spec.name, "sleep60-001");
        assert!(descriptor.spec.health.is_none());
    }

    #[test]
    fn empty_id_or_cmd_is_rejected() {
        assert!(TaskDescriptor::try_from(raw_task("  ", "echo hi")).is_err());
        assert!(TaskDescriptor::try_from(raw_task("t-1", "")).is_err());
    }

    #[test]
    fn health_section_is_parsed() {
        let mut raw = raw_task("web-001", "serve");
        raw.task.health = Some(RawHealthSection {
            cmd: "true".to_string(),
            interval: "10s".to_string(),
            initial_interval: None,
            max_consecutive_failures: 2,
        });

        let descriptor = TaskDescriptor::try_from(raw).unwrap();
        let health = descriptor.spec.health.expect("health spec");
        assert_eq!(health.settings.interval, Duration::from_secs(10));
        assert_eq!(health.settings.initial_interval, None);
        assert_eq!(health.settings.max_consecutive_failures, 2);
    }
}
