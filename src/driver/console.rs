// src/driver/console.rs

use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::types::StatusUpdate;

use super::{Driver, DriverError};

/// Driver that writes every status update as one JSON line.
///
/// Defaults to stdout; any `Write` sink can be used.
pub struct ConsoleDriver<W: Write + Send = io::Stdout> {
    out: Mutex<W>,
    stopped: AtomicBool,
}

impl ConsoleDriver<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleDriver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Consume the driver and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Driver for ConsoleDriver<W> {
    fn send_status_update(&self, update: &StatusUpdate) -> Result<(), DriverError> {
        let line =
            serde_json::to_string(update).map_err(|e| DriverError::Transport(e.to_string()))?;
        let mut out = self.out.lock().map_err(|_| DriverError::Disconnected)?;
        writeln!(out, "{line}")
            .and_then(|_| out.flush())
            .map_err(|e| DriverError::Transport(e.to_string()))
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("console driver stopped");
        }
    }
}
