// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{ExecutorSettings, RawExecutorConfig, RawTaskFile, TaskDescriptor};
use crate::errors::Result;

/// Parse and validate a task descriptor from TOML text.
pub fn parse_task(contents: &str) -> Result<TaskDescriptor> {
    let raw: RawTaskFile = toml::from_str(contents)?;
    TaskDescriptor::try_from(raw)
}

/// Load a task descriptor file from disk and validate it.
pub fn load_task(path: impl AsRef<Path>) -> Result<TaskDescriptor> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_task(&contents)
}

/// Parse and validate executor settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<ExecutorSettings> {
    let raw: RawExecutorConfig = toml::from_str(contents)?;
    ExecutorSettings::try_from(raw)
}

/// Load executor settings from an optional path.
///
/// With no path, built-in defaults are used.
pub fn load_settings(path: Option<&Path>) -> Result<ExecutorSettings> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            parse_settings(&contents)
        }
        None => Ok(ExecutorSettings::default()),
    }
}
