//! Cross-handle scenarios for the counter store and run index: each handle
//! models an independent pipeline subprocess sharing one cache directory.

use tempfile::TempDir;
use trellis_store::{AllocationStatus, CacheLayout, CounterStore, RunIndex, RunIndexEntry};

#[test]
fn test_racing_processes_never_share_a_version() {
    let temp = TempDir::new().unwrap();
    let layout = CacheLayout::for_workspace_root(temp.path());
    layout.ensure_dirs().unwrap();

    let key = "resume-ner:hpo:1f2e3d4c:local";
    let mut versions = Vec::new();
    for i in 0..8 {
        // a fresh handle per reservation: no shared in-process state
        let counters = CounterStore::new(layout.counter_path());
        versions.push(counters.reserve(key, &format!("pending-{i}")).unwrap());
    }

    let mut sorted = versions.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), versions.len(), "duplicate version issued");
    assert_eq!(sorted, (1..=8).collect::<Vec<u64>>(), "gap in versions");
}

#[test]
fn test_commits_from_other_handles_are_visible() {
    let temp = TempDir::new().unwrap();
    let layout = CacheLayout::for_workspace_root(temp.path());
    layout.ensure_dirs().unwrap();
    let key = "resume-ner:final:aa11bb22:local";

    let writer = CounterStore::new(layout.counter_path());
    let version = writer.reserve(key, "pending").unwrap();

    let committer = CounterStore::new(layout.counter_path());
    committer.commit(key, version, "run-42").unwrap();

    let reader = CounterStore::new(layout.counter_path());
    let records = reader.allocations().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, AllocationStatus::Committed);
    assert_eq!(records[0].run_id, "run-42");
}

#[test]
fn test_index_updates_are_visible_across_handles() {
    let temp = TempDir::new().unwrap();
    let layout = CacheLayout::for_workspace_root(temp.path());
    layout.ensure_dirs().unwrap();

    let writer = RunIndex::new(layout.index_path());
    writer
        .record(
            "deadbeef",
            RunIndexEntry {
                run_id: "run-7".to_string(),
                experiment_id: "exp-1".to_string(),
                tracking_uri: "http://mlflow:5000".to_string(),
                updated_at: chrono::Utc::now(),
                extra: Default::default(),
            },
        )
        .unwrap();

    let reader = RunIndex::new(layout.index_path());
    let entry = reader
        .get("deadbeef", Some("http://mlflow:5000"))
        .unwrap()
        .unwrap();
    assert_eq!(entry.run_id, "run-7");
}
