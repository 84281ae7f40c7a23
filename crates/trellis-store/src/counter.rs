//! Reserve/commit version allocator for human-readable run names.
//!
//! Two concurrent processes naming runs under the same logical study must
//! never receive the same suffix, without a central sequence service. The
//! protocol:
//!
//! - **reserve** appends a `reserved` record whose version is one past the
//!   highest version ever issued for the counter key — any status counts.
//!   A crashed-and-retried caller therefore cannot collide with a caller
//!   that succeeded concurrently; the worst race outcome is a skipped
//!   version, never a duplicate.
//! - **commit** flips the matching reservation to `committed` and stamps
//!   the real run id. A missing reservation is an idempotent no-op: commit
//!   may be retried speculatively after crash recovery.
//! - **cleanup** flips reservations older than the staleness threshold to
//!   `expired` in place. Expired records are audit trail; they still count
//!   toward monotonicity.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::atomic::{atomic_write_json, read_json_or_default};
use crate::error::StoreResult;
use crate::lock::FileLock;

pub const COUNTER_FILENAME: &str = "run_name_counter.json";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_STALENESS_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Reserved,
    Committed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub counter_key: String,
    pub version: u64,
    pub run_id: String,
    pub status: AllocationStatus,
    pub reserved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CounterFile {
    #[serde(default)]
    allocations: Vec<AllocationRecord>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Handle on the counter file.
#[derive(Debug, Clone)]
pub struct CounterStore {
    path: PathBuf,
    lock_timeout: Duration,
    staleness: chrono::Duration,
}

impl CounterStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            staleness: chrono::Duration::hours(DEFAULT_STALENESS_HOURS),
        }
    }

    #[must_use]
    pub fn with_staleness(mut self, staleness: chrono::Duration) -> Self {
        self.staleness = staleness;
        self
    }

    /// Reserve the next version for a counter key.
    ///
    /// `placeholder_run_id` is stamped on the reservation so an operator
    /// can correlate an abandoned reservation with its (possibly orphaned)
    /// tracked run later.
    pub fn reserve(&self, counter_key: &str, placeholder_run_id: &str) -> StoreResult<u64> {
        let lock = FileLock::for_store_file(&self.path);
        let _guard = lock.acquire(self.lock_timeout);

        let mut file: CounterFile = read_json_or_default(&self.path)?;
        let version = file
            .allocations
            .iter()
            .filter(|a| a.counter_key == counter_key)
            .map(|a| a.version)
            .max()
            .unwrap_or(0)
            + 1;

        file.allocations.push(AllocationRecord {
            counter_key: counter_key.to_string(),
            version,
            run_id: placeholder_run_id.to_string(),
            status: AllocationStatus::Reserved,
            reserved_at: Utc::now(),
            committed_at: None,
            extra: BTreeMap::new(),
        });
        atomic_write_json(&self.path, &file)?;
        debug!(counter_key, version, "reserved run-name version");
        Ok(version)
    }

    /// Commit a reservation, stamping the real run id.
    ///
    /// Idempotent: committing an already-committed or unknown
    /// `(counter_key, version)` logs and returns without error.
    pub fn commit(&self, counter_key: &str, version: u64, run_id: &str) -> StoreResult<()> {
        let lock = FileLock::for_store_file(&self.path);
        let _guard = lock.acquire(self.lock_timeout);

        let mut file: CounterFile = read_json_or_default(&self.path)?;
        let Some(record) = file
            .allocations
            .iter_mut()
            .find(|a| a.counter_key == counter_key && a.version == version)
        else {
            warn!(counter_key, version, "no reservation found to commit, ignoring");
            return Ok(());
        };

        if record.status == AllocationStatus::Committed {
            debug!(counter_key, version, "reservation already committed");
            return Ok(());
        }

        record.status = AllocationStatus::Committed;
        record.run_id = run_id.to_string();
        record.committed_at = Some(Utc::now());
        atomic_write_json(&self.path, &file)?;
        debug!(counter_key, version, run_id, "committed run-name version");
        Ok(())
    }

    /// Flip stale reservations to `expired`. Returns how many were flipped.
    ///
    /// Records are never deleted: expired entries keep their version out of
    /// circulation forever and preserve the audit trail (including the
    /// placeholder run id of whatever process crashed).
    pub fn cleanup(&self) -> StoreResult<usize> {
        let lock = FileLock::for_store_file(&self.path);
        let _guard = lock.acquire(self.lock_timeout);

        let mut file: CounterFile = read_json_or_default(&self.path)?;
        let cutoff = Utc::now() - self.staleness;
        let mut expired = 0;
        for record in &mut file.allocations {
            if record.status == AllocationStatus::Reserved && record.reserved_at < cutoff {
                record.status = AllocationStatus::Expired;
                expired += 1;
                info!(
                    counter_key = %record.counter_key,
                    version = record.version,
                    placeholder_run_id = %record.run_id,
                    "expired stale run-name reservation"
                );
            }
        }
        if expired > 0 {
            atomic_write_json(&self.path, &file)?;
        }
        Ok(expired)
    }

    /// All allocation records, in issue order.
    pub fn allocations(&self) -> StoreResult<Vec<AllocationRecord>> {
        let file: CounterFile = read_json_or_default(&self.path)?;
        Ok(file.allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> CounterStore {
        CounterStore::new(temp.path().join(COUNTER_FILENAME))
    }

    #[test]
    fn test_versions_are_gapless_without_commits() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp);

        let versions: Vec<u64> = (0..5)
            .map(|i| counters.reserve("proj:hpo:abc:local", &format!("pending-{i}")).unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_reserve_commit_reserve_sequence() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp);
        let key = "proj:hpo:abc:local";

        for expected in 1..=3 {
            let version = counters.reserve(key, "pending").unwrap();
            assert_eq!(version, expected);
            counters.commit(key, version, &format!("run-{version}")).unwrap();
        }

        // fourth reservation without a commit still advances
        assert_eq!(counters.reserve(key, "pending").unwrap(), 4);
    }

    #[test]
    fn test_independent_counter_keys() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp);

        assert_eq!(counters.reserve("a", "p").unwrap(), 1);
        assert_eq!(counters.reserve("b", "p").unwrap(), 1);
        assert_eq!(counters.reserve("a", "p").unwrap(), 2);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp);
        let key = "proj:final:xyz:local";

        let version = counters.reserve(key, "pending").unwrap();
        counters.commit(key, version, "run-1").unwrap();
        let after_first: Vec<AllocationRecord> = counters.allocations().unwrap();

        counters.commit(key, version, "run-1").unwrap();
        let after_second: Vec<AllocationRecord> = counters.allocations().unwrap();

        // second commit changes nothing, not even timestamps
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_commit_without_reservation_is_a_noop() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp);
        counters.commit("ghost", 7, "run-1").unwrap();
        assert!(counters.allocations().unwrap().is_empty());
    }

    #[test]
    fn test_out_of_order_commits_keep_monotonicity() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp);
        let key = "proj:trial:abc:local";

        let v1 = counters.reserve(key, "p1").unwrap();
        let v2 = counters.reserve(key, "p2").unwrap();
        let v3 = counters.reserve(key, "p3").unwrap();

        counters.commit(key, v3, "run-3").unwrap();
        counters.commit(key, v1, "run-1").unwrap();
        counters.commit(key, v2, "run-2").unwrap();

        assert_eq!(counters.reserve(key, "p4").unwrap(), 4);
    }

    #[test]
    fn test_cleanup_expires_but_never_reuses() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp).with_staleness(chrono::Duration::zero());
        let key = "proj:hpo:abc:local";

        let abandoned = counters.reserve(key, "crashed-process").unwrap();
        assert_eq!(counters.cleanup().unwrap(), 1);

        let records = counters.allocations().unwrap();
        assert_eq!(records[0].status, AllocationStatus::Expired);
        assert_eq!(records[0].run_id, "crashed-process");

        // the expired version stays out of circulation
        assert_eq!(counters.reserve(key, "retry").unwrap(), abandoned + 1);
    }

    #[test]
    fn test_cleanup_ignores_fresh_and_committed() {
        let temp = TempDir::new().unwrap();
        let counters = store(&temp);
        let key = "proj:hpo:abc:local";

        let version = counters.reserve(key, "pending").unwrap();
        counters.commit(key, version, "run-1").unwrap();
        counters.reserve(key, "fresh").unwrap();

        assert_eq!(counters.cleanup().unwrap(), 0);
    }
}
