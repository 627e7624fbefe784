// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod health;
pub mod logging;
pub mod runner;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::clock::{Clock, TokioClock};
use crate::config::{ExecutorSettings, TaskDescriptor, load_settings, load_task};
use crate::driver::ConsoleDriver;
use crate::executor::{Executor, ExecutorReport, LaunchAck};
use crate::runner::ProcessRunnerFactory;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings and task descriptor loading
/// - the process runner, console driver and clock
/// - the executor loop
/// - Ctrl-C handling
///
/// Returns `None` for `--dry-run`.
pub async fn run(args: CliArgs) -> Result<Option<ExecutorReport>> {
    let settings = load_settings(args.config.as_deref().map(Path::new))
        .context("loading executor settings")?;
    let descriptor = load_task(&args.task)
        .with_context(|| format!("loading task descriptor {}", args.task))?;

    if args.dry_run {
        print_dry_run(&settings, &descriptor);
        return Ok(None);
    }

    let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());
    let factory = Arc::new(ProcessRunnerFactory::new(
        settings.kill_grace,
        Arc::clone(&clock),
    ));
    let driver = Arc::new(ConsoleDriver::stdout());

    // A health section in the descriptor is picked up by the executor itself.
    let (executor, handle) = Executor::new(factory, driver, settings, clock);
    let executor = tokio::spawn(executor.run());

    // Ctrl-C → kill the task and report its terminal status.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; shutting down");
            let _ = handle.shutdown().await;
        });
    }

    let task_id = descriptor.task_id.clone();
    match handle.launch_task(descriptor).await? {
        LaunchAck::Accepted => debug!(%task_id, "task accepted"),
        LaunchAck::Ignored => warn!(%task_id, "executor ignored the launch request"),
    }

    let report = executor.await.context("executor task panicked")?;
    Ok(Some(report))
}

/// Simple dry-run output: print settings and the task.
fn print_dry_run(settings: &ExecutorSettings, descriptor: &TaskDescriptor) {
    println!("taskwarden dry-run");
    match settings.launch_timeout {
        Some(timeout) => println!("  executor.launch_timeout = {timeout:?}"),
        None => println!("  executor.launch_timeout = disabled"),
    }
    println!("  executor.init_poll_interval = {:?}", settings.init_poll_interval);
    println!("  executor.status_poll_interval = {:?}", settings.status_poll_interval);
    println!("  executor.stop_wait = {:?}", settings.stop_wait);
    println!("  executor.kill_grace = {:?}", settings.kill_grace);
    println!();

    let spec = &descriptor.spec;
    println!("task {}:", descriptor.task_id);
    println!("  name: {}", spec.name);
    println!("  cmd: {}", spec.cmd);
    if let Some(ref dir) = spec.workdir {
        println!("  workdir: {}", dir.display());
    }
    for (key, value) in &spec.env {
        println!("  env.{key} = {value}");
    }
    if let Some(ref health) = spec.health {
        println!("  health.cmd: {}", health.cmd);
        println!("  health.interval: {:?}", health.settings.interval);
        println!(
            "  health.initial_interval: {:?}",
            health.settings.effective_initial_interval()
        );
        println!(
            "  health.max_consecutive_failures: {}",
            health.settings.max_consecutive_failures
        );
    }

    debug!("dry-run complete (no execution)");
}
