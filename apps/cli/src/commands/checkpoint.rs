//! Checkpoint resolution from the local cache.
//!
//! The CLI has no tracking-server binding, so resolution is scoped to the
//! local source tier; the pipeline itself goes through the full chain.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use trellis_artifacts::{AcquireRequest, ArtifactSource, CheckpointResolver};
use trellis_store::CacheLayout;
use trellis_tracking::{ExecutionEnvironment, InMemoryTrackingClient};

#[derive(Subcommand, Debug)]
pub enum CheckpointCommand {
    /// Resolve a checkpoint from the local cache
    Resolve {
        /// Tracked run id (checks the run-id-keyed cache)
        #[arg(long)]
        run_id: Option<String>,
        /// Identity hash (checks the hash-keyed cache and the sweep layout)
        #[arg(long)]
        key_hash: Option<String>,
        /// Trial index inside the legacy sweep layout
        #[arg(long)]
        trial_index: Option<u32>,
        /// Accept directories that fail checkpoint validation
        #[arg(long)]
        no_validate: bool,
    },
}

pub fn execute(cmd: CheckpointCommand, workspace: &Path) -> Result<()> {
    let layout = CacheLayout::for_workspace_root(workspace);
    // offline stand-in client: the remote tier is never part of CLI resolution
    let client = InMemoryTrackingClient::new("cli://offline");

    match cmd {
        CheckpointCommand::Resolve { run_id, key_hash, trial_index, no_validate } => {
            let resolver = CheckpointResolver::new(&client, &layout, ExecutionEnvironment::Local);
            let mut request = AcquireRequest {
                run_id,
                key_hash,
                trial_index,
                sources: vec![ArtifactSource::Local],
                ..AcquireRequest::default()
            };
            if no_validate {
                request.validation.local = false;
            }
            match resolver.acquire(&request) {
                Ok(location) => {
                    println!(
                        "{}  {}",
                        location.path.display().to_string().bold(),
                        format!("({}, {:?})", location.source, location.status).dimmed()
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{}", e.to_string().red());
                    std::process::exit(1);
                }
            }
        }
    }
}
