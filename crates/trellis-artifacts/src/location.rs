//! Artifact location records.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a checkpoint candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    Local,
    BackupStore,
    Remote,
}

impl std::fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactSource::Local => "local",
            ArtifactSource::BackupStore => "backup_store",
            ArtifactSource::Remote => "remote",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// Present and passed checkpoint validation.
    Verified,
    /// Present; validation was disabled for this source.
    Declared,
    /// The candidate path does not exist.
    Missing,
    /// Present but failed validation.
    Invalid,
}

/// One resolution result. Never mutated after creation — a fresh discovery
/// call produces a fresh location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub source: ArtifactSource,
    pub path: PathBuf,
    pub status: ArtifactStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ArtifactLocation {
    #[must_use]
    pub fn new(source: ArtifactSource, path: PathBuf, status: ArtifactStatus) -> Self {
        Self {
            source,
            path,
            status,
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Usable as a checkpoint root.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self.status, ArtifactStatus::Verified | ArtifactStatus::Declared)
    }
}
