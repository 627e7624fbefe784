// src/config/mod.rs

//! Configuration loading and validation for taskwarden.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load executor settings and task descriptors from disk (`loader.rs`).
//! - Validate and convert raw models into typed ones (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_settings, load_task, parse_settings, parse_task};
pub use model::{
    ExecutorSettings, HealthCheckSpec, RawExecutorConfig, RawTaskFile, TaskDescriptor, TaskSpec,
};
