//! Trellis Tracking
//!
//! The run-resolution layer between the identity primitives and a tracking
//! server:
//! - Abstract tracking client + in-memory backend (`client`, `memory`)
//! - Tag vocabulary and sanitization (`tags`)
//! - Run-mode / idempotency policy (`run_mode`)
//! - Human-readable run naming over the counter store (`naming`)
//! - The priority-ordered run finder and the trial-id lookup (`finder`,
//!   `trial_lookup`)
//!
//! The tracking server is abstract here: a key/value + tag + search service
//! reached through [`client::TrackingClient`]. Concrete SDK bindings live
//! outside this workspace; the in-memory backend exists for tests and
//! offline smoke runs.

pub mod client;
pub mod error;
pub mod finder;
pub mod memory;
pub mod naming;
pub mod run_mode;
pub mod tags;
pub mod trial_lookup;

pub use client::{
    CreateRunRequest, Experiment, Run, RunFilter, RunOrder, RunStatus, TrackingClient,
};
pub use error::{TrackingError, TrackingResult};
pub use finder::{
    read_run_metadata, write_run_metadata, Discovery, DiscoveryTier, FindOutcome, FindRequest,
    RunFinder, RunMetadataFile, RUN_METADATA_FILENAME,
};
pub use memory::InMemoryTrackingClient;
pub use naming::{build_run_name, counter_key, run_tags, ExecutionEnvironment, NamingContext};
pub use run_mode::{load_if_exists, should_reuse, ProcessKind, RunMode};
pub use trial_lookup::find_run_by_trial_id;
