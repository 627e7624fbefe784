// src/health/command.rs

use std::process::Command;

use anyhow::{Context, Result};

use super::{CheckResult, HealthCheck};

/// Health check that runs a shell command; exit status 0 means healthy.
///
/// Blocking: the monitor runs checks on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct CommandHealthCheck {
    cmd: String,
}

impl CommandHealthCheck {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }
}

impl HealthCheck for CommandHealthCheck {
    fn check(&self) -> Result<CheckResult> {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        let output = command
            .output()
            .with_context(|| format!("running health check command '{}'", self.cmd))?;

        if output.status.success() {
            return Ok(CheckResult::healthy());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let reason = if stderr.is_empty() {
            format!("'{}' exited with {}", self.cmd, code)
        } else {
            format!("'{}' exited with {}: {}", self.cmd, code, stderr)
        };
        Ok(CheckResult::unhealthy(reason))
    }
}
