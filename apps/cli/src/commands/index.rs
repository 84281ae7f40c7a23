//! Local run index inspection and maintenance.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use trellis_store::{CacheLayout, RunIndex};

#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// List index entries, most recently updated first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up one identity hash
    Get {
        key_hash: String,
        /// Only accept entries recorded against this tracking endpoint
        #[arg(long)]
        tracking_uri: Option<String>,
    },
    /// Remove an entry (e.g. after deleting the run on the backend)
    Remove { key_hash: String },
}

pub fn execute(cmd: IndexCommand, workspace: &Path) -> Result<()> {
    let layout = CacheLayout::for_workspace_root(workspace);
    let index = RunIndex::new(layout.index_path());

    match cmd {
        IndexCommand::List { json } => {
            let entries = index.entries()?;
            if json {
                let rendered: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|(hash, entry)| {
                        serde_json::json!({
                            "key_hash": hash,
                            "run_id": entry.run_id,
                            "experiment_id": entry.experiment_id,
                            "tracking_uri": entry.tracking_uri,
                            "updated_at": entry.updated_at,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rendered)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("{}", "index is empty".dimmed());
                return Ok(());
            }
            for (hash, entry) in entries {
                println!(
                    "{}  {}  {}  {}",
                    &hash[..hash.len().min(16)].bold(),
                    entry.run_id,
                    entry.tracking_uri.dimmed(),
                    entry.updated_at.to_rfc3339().dimmed()
                );
            }
            Ok(())
        }
        IndexCommand::Get { key_hash, tracking_uri } => {
            match index.get(&key_hash, tracking_uri.as_deref())? {
                Some(entry) => {
                    println!("run_id:        {}", entry.run_id.bold());
                    println!("experiment_id: {}", entry.experiment_id);
                    println!("tracking_uri:  {}", entry.tracking_uri);
                    println!("updated_at:    {}", entry.updated_at.to_rfc3339());
                }
                None => println!("{}", "no entry for that hash".yellow()),
            }
            Ok(())
        }
        IndexCommand::Remove { key_hash } => {
            if index.remove(&key_hash)? {
                println!("{}", "removed".green());
            } else {
                println!("{}", "no entry for that hash".yellow());
            }
            Ok(())
        }
    }
}
