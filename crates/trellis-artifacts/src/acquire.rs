//! Priority-ordered checkpoint acquisition.
//!
//! Resolution order is caller-configurable but defaults to cheapest-first:
//! local cache (by run id, by identity hash, then the legacy sweep layout),
//! the backup store (hosted-notebook platform only), and finally the remote
//! tracking server. Every candidate passes checkpoint validation unless the
//! caller disables it for a source; an invalid candidate is skipped, not
//! fatal. Only exhausting every configured source raises.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::archive::{extract_archive, is_archive};
use crate::backup::BackupStore;
use crate::error::{ArtifactError, ArtifactResult};
use crate::location::{ArtifactLocation, ArtifactSource, ArtifactStatus};
use crate::validate::{is_valid_checkpoint_dir, CHECKPOINT_CONFIG_FILENAME, WEIGHT_FILENAMES};
use trellis_store::CacheLayout;
use trellis_tracking::{ExecutionEnvironment, TrackingClient};

/// Per-source validation toggles. Disabling a source accepts non-standard
/// checkpoint layouts at the caller's own risk.
#[derive(Debug, Clone, Copy)]
pub struct ValidationPolicy {
    pub local: bool,
    pub backup: bool,
    pub remote: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self { local: true, backup: true, remote: true }
    }
}

impl ValidationPolicy {
    fn for_source(self, source: ArtifactSource) -> bool {
        match source {
            ArtifactSource::Local => self.local,
            ArtifactSource::BackupStore => self.backup,
            ArtifactSource::Remote => self.remote,
        }
    }
}

/// What to resolve and which sources to consult.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub run_id: Option<String>,
    pub key_hash: Option<String>,
    /// Trial index inside the legacy sweep output layout.
    pub trial_index: Option<u32>,
    pub sources: Vec<ArtifactSource>,
    pub validation: ValidationPolicy,
}

impl Default for AcquireRequest {
    fn default() -> Self {
        Self {
            run_id: None,
            key_hash: None,
            trial_index: None,
            sources: vec![
                ArtifactSource::Local,
                ArtifactSource::BackupStore,
                ArtifactSource::Remote,
            ],
            validation: ValidationPolicy::default(),
        }
    }
}

pub struct CheckpointResolver<'a> {
    client: &'a dyn TrackingClient,
    layout: &'a CacheLayout,
    environment: ExecutionEnvironment,
    backup: Option<&'a dyn BackupStore>,
}

impl<'a> CheckpointResolver<'a> {
    #[must_use]
    pub fn new(
        client: &'a dyn TrackingClient,
        layout: &'a CacheLayout,
        environment: ExecutionEnvironment,
    ) -> Self {
        Self { client, layout, environment, backup: None }
    }

    #[must_use]
    pub fn with_backup_store(mut self, backup: &'a dyn BackupStore) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn acquire(&self, request: &AcquireRequest) -> ArtifactResult<ArtifactLocation> {
        let mut attempted = Vec::new();

        for source in &request.sources {
            let validate = request.validation.for_source(*source);
            let hit = match source {
                ArtifactSource::Local => self.try_local(request, validate, &mut attempted),
                ArtifactSource::BackupStore => self.try_backup(request, validate, &mut attempted),
                ArtifactSource::Remote => self.try_remote(request, validate, &mut attempted),
            };
            if let Some(location) = hit {
                return Ok(location);
            }
        }

        let identity = request
            .key_hash
            .clone()
            .or_else(|| request.run_id.clone())
            .unwrap_or_else(|| "<unknown identity>".to_string());
        Err(ArtifactError::Exhausted {
            identity,
            attempted,
            tracking_uri: self.client.tracking_uri().to_string(),
            run_hint: request.run_id.clone().unwrap_or_else(|| "<run id unknown>".to_string()),
            artifact_hint: "checkpoint".to_string(),
            cache_dir: self.layout.root().display().to_string(),
        })
    }

    fn local_candidates(&self, request: &AcquireRequest) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(run_id) = &request.run_id {
            candidates.push(self.layout.run_checkpoint_dir(run_id));
        }
        match &request.key_hash {
            Some(key_hash) => {
                candidates.push(self.layout.hash_checkpoint_dir(key_hash));
                if let Some(trial_index) = request.trial_index {
                    let prefix = &key_hash[..key_hash.len().min(8)];
                    candidates.push(
                        self.layout
                            .legacy_sweep_dir()
                            .join(prefix)
                            .join(format!("trial_{trial_index}"))
                            .join("checkpoint"),
                    );
                }
            }
            None => {
                // local discovery is hash-keyed; without the hash this tier
                // quietly narrows to the run-id path (or nothing)
                debug!("no identity hash supplied, skipping hash-keyed local checkpoint paths");
            }
        }
        candidates
    }

    fn try_local(
        &self,
        request: &AcquireRequest,
        validate: bool,
        attempted: &mut Vec<String>,
    ) -> Option<ArtifactLocation> {
        for candidate in self.local_candidates(request) {
            if let Some(location) =
                self.consider(ArtifactSource::Local, candidate, validate, attempted)
            {
                return Some(location);
            }
        }
        None
    }

    fn try_backup(
        &self,
        request: &AcquireRequest,
        validate: bool,
        attempted: &mut Vec<String>,
    ) -> Option<ArtifactLocation> {
        let backup = self.backup?;
        if self.environment != ExecutionEnvironment::HostedNotebook {
            debug!(environment = %self.environment, "backup store is only consulted on the hosted notebook");
            return None;
        }
        for local_path in self.local_candidates(request) {
            let Some(remote_path) = backup.path_for(&local_path) else {
                continue;
            };
            attempted.push(format!("backup_store:{}", remote_path.display()));
            match backup.restore(&remote_path, &local_path, true) {
                Ok(true) => {
                    if validate && !is_valid_checkpoint_dir(&local_path) {
                        warn!(path = %local_path.display(), "restored backup failed checkpoint validation, skipping");
                        continue;
                    }
                    let status = if validate { ArtifactStatus::Verified } else { ArtifactStatus::Declared };
                    return Some(
                        ArtifactLocation::new(ArtifactSource::BackupStore, local_path, status)
                            .with_metadata("restored_from", &remote_path.display().to_string()),
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %remote_path.display(), error = %e, "backup restore failed, trying next source");
                }
            }
        }
        None
    }

    fn try_remote(
        &self,
        request: &AcquireRequest,
        validate: bool,
        attempted: &mut Vec<String>,
    ) -> Option<ArtifactLocation> {
        let Some(run_id) = &request.run_id else {
            debug!("no run id for remote checkpoint download, skipping remote source");
            return None;
        };
        attempted.push(format!("remote:{}", self.client.tracking_uri()));

        let artifacts = match self.client.list_artifacts(run_id) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!(%run_id, error = %e, "listing remote artifacts failed");
                return None;
            }
        };
        let Some(artifact_path) = checkpoint_artifact_path(&artifacts) else {
            debug!(%run_id, "no checkpoint-shaped artifact among {} paths", artifacts.len());
            return None;
        };

        let download_dir = self.layout.run_checkpoint_dir(run_id).join("download");
        let downloaded = match self.client.download_artifacts(run_id, &artifact_path, &download_dir) {
            Ok(path) => path,
            Err(e) => {
                warn!(%run_id, %artifact_path, error = %e, "remote checkpoint download failed");
                return None;
            }
        };

        let root = if is_archive(&downloaded) {
            match extract_archive(&downloaded, &download_dir.join("extracted")) {
                Ok(root) => root,
                Err(e) => {
                    warn!(path = %downloaded.display(), error = %e, "checkpoint archive extraction failed");
                    return None;
                }
            }
        } else {
            downloaded
        };

        if validate && !is_valid_checkpoint_dir(&root) {
            warn!(path = %root.display(), "downloaded checkpoint failed validation");
            return None;
        }
        let status = if validate { ArtifactStatus::Verified } else { ArtifactStatus::Declared };
        Some(
            ArtifactLocation::new(ArtifactSource::Remote, root, status)
                .with_metadata("artifact_path", &artifact_path)
                .with_metadata("tracking_uri", self.client.tracking_uri()),
        )
    }

    fn consider(
        &self,
        source: ArtifactSource,
        path: PathBuf,
        validate: bool,
        attempted: &mut Vec<String>,
    ) -> Option<ArtifactLocation> {
        attempted.push(format!("{source}:{}", path.display()));
        if !path.exists() {
            debug!(path = %path.display(), "checkpoint candidate missing");
            return None;
        }
        if validate && !is_valid_checkpoint_dir(&path) {
            debug!(path = %path.display(), "checkpoint candidate failed validation, skipping");
            return None;
        }
        let status = if validate { ArtifactStatus::Verified } else { ArtifactStatus::Declared };
        Some(ArtifactLocation::new(source, path, status))
    }
}

/// Pick the checkpoint-shaped artifact from a run's artifact listing.
///
/// Preference order: a compressed checkpoint archive, then the directory
/// holding a known weight/config file, then anything under `checkpoint/`.
fn checkpoint_artifact_path(paths: &[String]) -> Option<String> {
    if let Some(archive) = paths.iter().find(|p| p.ends_with(".tar.gz") || p.ends_with(".tgz")) {
        return Some(archive.clone());
    }
    for path in paths {
        let file = path.rsplit('/').next().unwrap_or(path);
        if WEIGHT_FILENAMES.contains(&file) || file == CHECKPOINT_CONFIG_FILENAME {
            return Some(match path.rsplit_once('/') {
                Some((dir, _)) => dir.to_string(),
                None => String::new(),
            });
        }
    }
    paths
        .iter()
        .find(|p| p.starts_with("checkpoint/"))
        .map(|_| "checkpoint".to_string())
}
