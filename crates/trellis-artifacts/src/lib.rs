//! Trellis Artifacts
//!
//! Validated checkpoint acquisition with layered fallbacks:
//! - Artifact location records (`location`)
//! - Checkpoint validation (`validate`)
//! - The secondary backup store seam (`backup`)
//! - Archive extraction (`archive`)
//! - The local → backup → remote acquisition chain (`acquire`)
//!
//! Acquisition never hard-fails on a single bad candidate; it skips and
//! tries the next tier. Only exhausting every configured source raises,
//! and that error names each attempted source plus the manual-recovery
//! path for the active tracking backend.

pub mod acquire;
pub mod archive;
pub mod backup;
pub mod error;
pub mod location;
pub mod validate;

pub use acquire::{AcquireRequest, CheckpointResolver, ValidationPolicy};
pub use archive::extract_archive;
pub use backup::{BackupStore, DirectoryBackupStore};
pub use error::{ArtifactError, ArtifactResult};
pub use location::{ArtifactLocation, ArtifactSource, ArtifactStatus};
pub use validate::{is_valid_checkpoint_dir, CHECKPOINT_CONFIG_FILENAME, WEIGHT_FILENAMES};
