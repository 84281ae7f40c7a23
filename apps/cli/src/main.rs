//! Trellis CLI - Operator tooling for the training pipeline's identity and
//! idempotency subsystem.
//!
//! Computes study/trial keys and fingerprints from config files, inspects
//! and maintains the local run index and run-name counter store, and
//! resolves checkpoints from the local cache.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{checkpoint, counter, index, key};

/// Trellis - deterministic identity for ML training pipelines
#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    author,
    version,
    about = "Trellis - identity and idempotent-run tooling for training pipelines"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Workspace directory holding the .trellis cache (defaults to cwd)
    #[arg(short = 'w', long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute study/trial/family keys and content fingerprints
    #[command(subcommand)]
    Key(key::KeyCommand),

    /// Inspect and maintain the local run index
    #[command(subcommand)]
    Index(index::IndexCommand),

    /// Inspect and maintain the run-name counter store
    #[command(subcommand)]
    Counter(counter::CounterCommand),

    /// Resolve checkpoints from the local cache
    #[command(subcommand)]
    Checkpoint(checkpoint::CheckpointCommand),
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = args
        .log_level
        .parse::<Level>()
        .unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let workspace = match args.workspace {
        Some(workspace) => workspace,
        None => std::env::current_dir()?,
    };

    match args.command {
        Command::Key(cmd) => key::execute(cmd),
        Command::Index(cmd) => index::execute(cmd, &workspace),
        Command::Counter(cmd) => counter::execute(cmd, &workspace),
        Command::Checkpoint(cmd) => checkpoint::execute(cmd, &workspace),
    }
}
