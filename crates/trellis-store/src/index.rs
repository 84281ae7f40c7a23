//! The local run index: identity hash → tracked run.
//!
//! A best-effort cache in front of the tracking server's tag search. An
//! entry that is missing, evicted or stale only costs a remote query; an
//! entry must never be torn or merged across backends, which is why reads
//! cross-check the tracking URI and writes go through lock + atomic rename.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::atomic::{atomic_write_json, read_json_or_default};
use crate::error::{StoreError, StoreResult};
use crate::lock::FileLock;

pub const INDEX_FILENAME: &str = "mlflow_index.json";

const DEFAULT_CAPACITY: usize = 512;
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// One identity-hash → run mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIndexEntry {
    pub run_id: String,
    pub experiment_id: String,
    pub tracking_uri: String,
    pub updated_at: DateTime<Utc>,
    /// Unknown fields from newer writers are preserved round-trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    entries: BTreeMap<String, RunIndexEntry>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Handle on the index file. Cheap to construct; every operation re-reads
/// the file so concurrent processes observe each other's updates.
#[derive(Debug, Clone)]
pub struct RunIndex {
    path: PathBuf,
    capacity: usize,
    lock_timeout: Duration,
}

impl RunIndex {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            capacity: DEFAULT_CAPACITY,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Look up a run by identity hash.
    ///
    /// `expected_tracking_uri` guards against returning a record that was
    /// written for a different backend or workspace; pass `None` to skip
    /// the cross-check.
    pub fn get(
        &self,
        key_hash: &str,
        expected_tracking_uri: Option<&str>,
    ) -> StoreResult<Option<RunIndexEntry>> {
        let file = self.load_tolerant()?;
        let Some(entry) = file.entries.get(key_hash) else {
            return Ok(None);
        };
        if let Some(expected) = expected_tracking_uri {
            if entry.tracking_uri != expected {
                debug!(
                    key_hash,
                    found = %entry.tracking_uri,
                    expected,
                    "index entry belongs to a different tracking endpoint, ignoring"
                );
                return Ok(None);
            }
        }
        Ok(Some(entry.clone()))
    }

    /// Record (or refresh) an entry, evicting least-recently-updated
    /// entries beyond capacity.
    pub fn record(&self, key_hash: &str, entry: RunIndexEntry) -> StoreResult<()> {
        let lock = FileLock::for_store_file(&self.path);
        let _guard = lock.acquire(self.lock_timeout);

        let mut file = self.load_tolerant()?;
        file.entries.insert(key_hash.to_string(), entry);
        self.evict(&mut file);
        atomic_write_json(&self.path, &file)
    }

    /// Remove an entry (e.g. after the backend reports the run deleted).
    pub fn remove(&self, key_hash: &str) -> StoreResult<bool> {
        let lock = FileLock::for_store_file(&self.path);
        let _guard = lock.acquire(self.lock_timeout);

        let mut file = self.load_tolerant()?;
        let removed = file.entries.remove(key_hash).is_some();
        if removed {
            atomic_write_json(&self.path, &file)?;
        }
        Ok(removed)
    }

    /// All entries, most recently updated first.
    pub fn entries(&self) -> StoreResult<Vec<(String, RunIndexEntry)>> {
        let file = self.load_tolerant()?;
        let mut entries: Vec<(String, RunIndexEntry)> = file.entries.into_iter().collect();
        entries.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at));
        Ok(entries)
    }

    fn evict(&self, file: &mut IndexFile) {
        if file.entries.len() <= self.capacity {
            return;
        }
        let mut by_age: Vec<(String, DateTime<Utc>)> = file
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.updated_at))
            .collect();
        by_age.sort_by_key(|(_, updated_at)| *updated_at);
        let excess = file.entries.len() - self.capacity;
        for (key, _) in by_age.into_iter().take(excess) {
            debug!(key_hash = %key, "evicting least-recently-updated index entry");
            file.entries.remove(&key);
        }
    }

    // The index is a cache: a corrupt file is dropped with a warning rather
    // than wedging every lookup.
    fn load_tolerant(&self) -> StoreResult<IndexFile> {
        match read_json_or_default::<IndexFile>(&self.path) {
            Ok(file) => Ok(file),
            Err(StoreError::Corrupt { path, .. }) => {
                warn!(%path, "discarding corrupt run index");
                Ok(IndexFile::default())
            }
            Err(e) => Err(e),
        }
    }
}
