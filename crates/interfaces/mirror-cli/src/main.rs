use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use mirror_cli::logging::init_logging;
use mirror_cli::scheduler::Scheduler;
use mirror_cli::validate::validate_inputs;
use mirror_cli::{load_options, OptionOverrides};
use mirror_pipeline::{SyncEngine, SyncRequest};
use tracing::{info, warn};

/// Keep a replica folder identical to a source folder.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Folder to mirror from. Never modified.
    #[arg(long, alias = "src_path")]
    src_path: Utf8PathBuf,
    /// Folder made to match the source. Created if missing.
    #[arg(long, alias = "replica_path")]
    replica_path: Utf8PathBuf,
    #[arg(long, alias = "log_file_path")]
    log_file_path: Utf8PathBuf,
    #[arg(
        long,
        alias = "sync_interval_in_seconds",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sync_interval_in_seconds: u64,

    /// JSON file with file_copy_batch_size, max_workers, hashing_file_chunk_size.
    #[arg(long)]
    config: Option<Utf8PathBuf>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    max_workers: Option<usize>,
    #[arg(long, help = "Hashing read size in bytes")]
    chunk_size: Option<usize>,

    #[arg(long, help = "Run a single pass and exit")]
    once: bool,
    #[arg(long, conflicts_with = "once", help = "Print what a pass would do as JSON")]
    plan: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    validate_inputs(
        &cli.src_path,
        &cli.replica_path,
        &cli.log_file_path,
        cli.sync_interval_in_seconds,
    )
    .context("Invalid arguments")?;

    let options = load_options(
        cli.config.as_deref(),
        OptionOverrides {
            batch_size: cli.batch_size,
            max_workers: cli.max_workers,
            chunk_size: cli.chunk_size,
        },
    )?;

    let _guard = init_logging(&cli.log_file_path, cli.verbose)?;

    let request = SyncRequest {
        source_root: cli.src_path,
        replica_root: cli.replica_path,
        options,
    };
    let engine = SyncEngine::new();

    if cli.plan {
        let plan = engine.compare(&request)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(ExitCode::SUCCESS);
    }

    let scheduler = Scheduler::new(
        engine,
        request,
        Duration::from_secs(cli.sync_interval_in_seconds),
    );

    if cli.once {
        let summary = scheduler.run_pass().await?;
        return Ok(if summary.is_clean() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(2)
        });
    }

    info!(
        "Mirroring every {}s, press Ctrl-C to stop",
        cli.sync_interval_in_seconds
    );
    scheduler.run(shutdown_signal()).await;
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
