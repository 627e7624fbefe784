// src/main.rs

use taskwarden::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("taskwarden error: {err:?}");
            std::process::exit(1);
        }
    }
}

/// Returns whether the process should exit successfully.
async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let report = run(args).await?;
    // `None` means dry-run: nothing was launched.
    Ok(report.is_none_or(|r| r.succeeded()))
}
