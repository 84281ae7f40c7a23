//! Trellis Store
//!
//! Crash-safe local state for the identity subsystem:
//! - Cache directory layout (`layout`)
//! - Best-effort advisory file locking (`lock`)
//! - Atomic JSON persistence (`atomic`)
//! - The run index: identity hash → tracked run (`index`)
//! - The reserve/commit counter store for run-name suffixes (`counter`)
//!
//! Both persisted files are plain JSON under the project cache directory.
//! They are caches and coordination aids, never the source of truth — the
//! tracking server is. Every write goes through lock + temp file + atomic
//! rename; a reader can never observe a torn file.

pub mod atomic;
pub mod counter;
pub mod error;
pub mod index;
pub mod layout;
pub mod lock;

pub use atomic::{atomic_write_json, read_json_or_default};
pub use counter::{AllocationRecord, AllocationStatus, CounterStore, COUNTER_FILENAME};
pub use error::{StoreError, StoreResult};
pub use index::{RunIndex, RunIndexEntry, INDEX_FILENAME};
pub use layout::CacheLayout;
pub use lock::{FileLock, LockGuard};
