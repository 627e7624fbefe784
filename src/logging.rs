// src/logging.rs

//! Diagnostics for the `taskwarden` binary.
//!
//! Stdout belongs to the console driver: every line on it is one JSON status
//! update, so a scheduler can read it as a stream. All tracing output, task
//! stdout/stderr relayed at `debug` included, therefore goes to stderr.
//!
//! The level comes from `--log-level`, then `TASKWARDEN_LOG`, then `info`.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "TASKWARDEN_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR).ok();
    let level = resolve_level(cli_level, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

/// An unparseable env value falls back to `info` rather than failing startup.
fn resolve_level(cli_level: Option<LogLevel>, env_level: Option<&str>) -> Level {
    if let Some(lvl) = cli_level {
        return match lvl {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        };
    }

    match env_level.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("error") => Level::ERROR,
        Some("warn" | "warning") => Level::WARN,
        Some("debug") => Level::DEBUG,
        Some("trace") => Level::TRACE,
        _ => Level::INFO,
    }
}
