// src/driver/mod.rs

//! Cluster driver boundary.
//!
//! - [`Driver`] is the capability the executor is handed: send status
//!   updates and signal termination.
//! - [`reporter`] wraps it in the single choke point that enforces status
//!   ordering.
//! - [`console`] is a driver that prints updates as JSON lines, used by the
//!   binary when no real cluster driver is attached.

use thiserror::Error;

use crate::types::StatusUpdate;

pub mod console;
pub mod reporter;

pub use console::ConsoleDriver;
pub use reporter::{ReportError, StatusReporter};

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("driver disconnected")]
    Disconnected,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Connection to the cluster driver.
///
/// Calls are never retried by the executor; a failed delivery is logged and
/// the lifecycle carries on.
pub trait Driver: Send + Sync {
    fn send_status_update(&self, update: &StatusUpdate) -> Result<(), DriverError>;

    /// Tell the driver this executor will accept no further work.
    fn stop(&self);
}
