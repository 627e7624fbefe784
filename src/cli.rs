// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskwarden`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskwarden",
    version,
    about = "Launch, supervise and health-check a single task, reporting its lifecycle.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task descriptor (TOML).
    #[arg(long, value_name = "PATH")]
    pub task: String,

    /// Path to the executor config file (TOML).
    ///
    /// If omitted, built-in defaults are used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKWARDEN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task and settings, but don't launch anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
