//! Run-name counter store inspection and maintenance.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use trellis_store::{AllocationStatus, CacheLayout, CounterStore};

#[derive(Subcommand, Debug)]
pub enum CounterCommand {
    /// List allocation records, optionally filtered by counter key
    List {
        /// Only records for this counter key
        #[arg(long)]
        key: Option<String>,
        /// Only expired records (orphan-hunting)
        #[arg(long)]
        expired: bool,
    },
    /// Reserve the next version for a counter key
    Reserve {
        counter_key: String,
        /// Placeholder run id stamped on the reservation
        #[arg(long, default_value = "cli-reserved")]
        placeholder: String,
    },
    /// Commit a reservation with the real run id
    Commit {
        counter_key: String,
        version: u64,
        run_id: String,
    },
    /// Expire reservations older than the staleness threshold
    Cleanup,
}

pub fn execute(cmd: CounterCommand, workspace: &Path) -> Result<()> {
    let layout = CacheLayout::for_workspace_root(workspace);
    let counters = CounterStore::new(layout.counter_path());

    match cmd {
        CounterCommand::List { key, expired } => {
            let records = counters.allocations()?;
            let mut shown = 0;
            for record in records {
                if let Some(key) = &key {
                    if &record.counter_key != key {
                        continue;
                    }
                }
                if expired && record.status != AllocationStatus::Expired {
                    continue;
                }
                let status = match record.status {
                    AllocationStatus::Reserved => "reserved".yellow(),
                    AllocationStatus::Committed => "committed".green(),
                    AllocationStatus::Expired => "expired".red(),
                };
                println!(
                    "{}  v{}  {}  {}  {}",
                    record.counter_key.bold(),
                    record.version,
                    status,
                    record.run_id,
                    record.reserved_at.to_rfc3339().dimmed()
                );
                shown += 1;
            }
            if shown == 0 {
                println!("{}", "no matching allocation records".dimmed());
            }
            Ok(())
        }
        CounterCommand::Reserve { counter_key, placeholder } => {
            let version = counters.reserve(&counter_key, &placeholder)?;
            println!("{version}");
            Ok(())
        }
        CounterCommand::Commit { counter_key, version, run_id } => {
            counters.commit(&counter_key, version, &run_id)?;
            println!("{}", "committed".green());
            Ok(())
        }
        CounterCommand::Cleanup => {
            let expired = counters.cleanup()?;
            println!("expired {expired} stale reservation(s)");
            Ok(())
        }
    }
}
