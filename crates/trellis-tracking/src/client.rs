//! Abstract tracking-store client.
//!
//! The subsystem never assumes it can lock or transact against the tracking
//! server; it relies only on individual calls being atomic at the
//! granularity the backend provides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrackingError, TrackingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Scheduled,
    Running,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    /// Whether the run reached a successful end state.
    #[must_use]
    pub fn is_finished(self) -> bool {
        self == RunStatus::Finished
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Scheduled => "SCHEDULED",
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        };
        f.write_str(s)
    }
}

/// A tracked run as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub experiment_id: String,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl Run {
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
}

/// A validated run-creation request.
///
/// The backend rejects empty run names with an opaque server error; making
/// the name non-empty at construction time keeps that failure impossible.
#[derive(Debug, Clone)]
pub struct CreateRunRequest {
    experiment_id: String,
    name: String,
    tags: BTreeMap<String, String>,
}

impl CreateRunRequest {
    pub fn new(experiment_id: &str, name: &str) -> TrackingResult<Self> {
        if name.trim().is_empty() {
            return Err(TrackingError::InvalidRequest(
                "run name must not be empty".to_string(),
            ));
        }
        if experiment_id.trim().is_empty() {
            return Err(TrackingError::InvalidRequest(
                "experiment id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            experiment_id: experiment_id.to_string(),
            name: name.trim().to_string(),
            tags: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags.extend(tags);
        self
    }

    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }
}

/// Structured search filter: tag equality plus an optional status.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub tag_equals: Vec<(String, String)>,
    pub status: Option<RunStatus>,
}

impl RunFilter {
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tag_equals.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn matches(&self, run: &Run) -> bool {
        if let Some(status) = self.status {
            if run.status != status {
                return false;
            }
        }
        self.tag_equals
            .iter()
            .all(|(key, value)| run.tag(key) == Some(value.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrder {
    StartTimeDesc,
    StartTimeAsc,
}

/// The tracking service as the core consumes it. All calls block; callers
/// needing timeouts wrap the client themselves.
pub trait TrackingClient: Send + Sync {
    /// Endpoint identity, used to scope local index entries to one backend.
    fn tracking_uri(&self) -> &str;

    fn get_run(&self, run_id: &str) -> TrackingResult<Run>;

    fn create_run(&self, request: CreateRunRequest) -> TrackingResult<Run>;

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()>;

    fn search_runs(
        &self,
        experiment_ids: &[String],
        filter: &RunFilter,
        max_results: usize,
        order: RunOrder,
    ) -> TrackingResult<Vec<Run>>;

    fn list_experiments(&self) -> TrackingResult<Vec<Experiment>>;

    fn list_artifacts(&self, run_id: &str) -> TrackingResult<Vec<String>>;

    /// Download one artifact path (file or directory) under `dst`, returning
    /// the local path of the downloaded root.
    fn download_artifacts(&self, run_id: &str, artifact_path: &str, dst: &Path)
        -> TrackingResult<PathBuf>;
}
