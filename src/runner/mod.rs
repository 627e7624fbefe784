// src/runner/mod.rs

//! Task runner abstraction.
//!
//! The executor never touches processes directly; it drives a [`TaskRunner`]
//! created by a [`RunnerFactory`]. Production code uses
//! [`ProcessTaskRunner`]; tests inject runners that fail or stall on demand.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::config::TaskDescriptor;
use crate::types::RunnerState;

pub mod process;

pub use process::{ProcessRunnerFactory, ProcessTaskRunner};

/// Boxed future returned by runner operations.
pub type RunnerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("initialization failed: {0}")]
    Initialize(String),

    #[error("start failed: {0}")]
    Start(String),

    #[error("failed to spawn task process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("runner is not initialized")]
    NotInitialized,

    #[error("runner was already started")]
    AlreadyStarted,
}

/// Owns launching, polling and killing the process behind one task.
pub trait TaskRunner: Send + Sync {
    /// Prepare the task (sandbox, working directory, ...).
    ///
    /// May return before initialization is complete; the executor then waits
    /// on [`is_initialized`](TaskRunner::is_initialized).
    fn initialize(&self) -> RunnerFuture<'_, Result<(), TaskError>>;

    fn is_initialized(&self) -> bool;

    /// Launch the task process.
    fn start(&self) -> RunnerFuture<'_, Result<(), TaskError>>;

    /// Non-blocking view of the process; `Running` until it terminates.
    fn poll_terminal_state(&self) -> RunnerState;

    /// Extra detail about the terminal state (exit code, error text).
    fn terminal_message(&self) -> Option<String> {
        None
    }

    /// Ask the process to terminate. Must be idempotent: only the first call
    /// may deliver anything.
    fn kill(&self, force: bool) -> RunnerFuture<'_, ()>;
}

/// Builds the runner for a task assignment.
pub trait RunnerFactory: Send + Sync {
    fn create(&self, descriptor: &TaskDescriptor) -> Result<Arc<dyn TaskRunner>, TaskError>;
}
