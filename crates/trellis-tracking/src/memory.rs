//! In-memory tracking backend.
//!
//! A complete [`TrackingClient`] over process-local state, used by the test
//! suites and by offline smoke runs. Artifacts are served from plain
//! directories registered per run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use crate::client::{
    CreateRunRequest, Experiment, Run, RunFilter, RunOrder, RunStatus, TrackingClient,
};
use crate::error::{TrackingError, TrackingResult};

#[derive(Debug, Default)]
struct State {
    experiments: Vec<Experiment>,
    runs: BTreeMap<String, Run>,
    artifact_roots: BTreeMap<String, PathBuf>,
}

pub struct InMemoryTrackingClient {
    tracking_uri: String,
    state: Mutex<State>,
}

impl InMemoryTrackingClient {
    #[must_use]
    pub fn new(tracking_uri: &str) -> Self {
        Self {
            tracking_uri: tracking_uri.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn create_experiment(&self, name: &str) -> String {
        let mut state = self.state.lock().expect("tracking state poisoned");
        if let Some(existing) = state.experiments.iter().find(|e| e.name == name) {
            return existing.experiment_id.clone();
        }
        let experiment_id = format!("exp-{}", state.experiments.len() + 1);
        state.experiments.push(Experiment {
            experiment_id: experiment_id.clone(),
            name: name.to_string(),
        });
        experiment_id
    }

    /// Register a local directory whose contents are this run's artifacts.
    pub fn put_artifact_root(&self, run_id: &str, root: &Path) {
        let mut state = self.state.lock().expect("tracking state poisoned");
        state
            .artifact_roots
            .insert(run_id.to_string(), root.to_path_buf());
    }

    /// Force a run's status (tests simulate crashes and completions).
    pub fn set_status(&self, run_id: &str, status: RunStatus) -> TrackingResult<()> {
        let mut state = self.state.lock().expect("tracking state poisoned");
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        run.status = status;
        Ok(())
    }

    /// Backdate a run's start time (tests exercise recency ordering).
    pub fn set_start_time(&self, run_id: &str, start_time: chrono::DateTime<Utc>) -> TrackingResult<()> {
        let mut state = self.state.lock().expect("tracking state poisoned");
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        run.start_time = start_time;
        Ok(())
    }

    fn artifact_root(&self, run_id: &str) -> TrackingResult<PathBuf> {
        let state = self.state.lock().expect("tracking state poisoned");
        state
            .artifact_roots
            .get(run_id)
            .cloned()
            .ok_or_else(|| TrackingError::Backend(format!("no artifacts registered for run {run_id}")))
    }
}

impl TrackingClient for InMemoryTrackingClient {
    fn tracking_uri(&self) -> &str {
        &self.tracking_uri
    }

    fn get_run(&self, run_id: &str) -> TrackingResult<Run> {
        let state = self.state.lock().expect("tracking state poisoned");
        state
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))
    }

    fn create_run(&self, request: CreateRunRequest) -> TrackingResult<Run> {
        let mut state = self.state.lock().expect("tracking state poisoned");
        if !state
            .experiments
            .iter()
            .any(|e| e.experiment_id == request.experiment_id())
        {
            return Err(TrackingError::ExperimentNotFound(
                request.experiment_id().to_string(),
            ));
        }
        let run = Run {
            run_id: Uuid::new_v4().simple().to_string(),
            experiment_id: request.experiment_id().to_string(),
            status: RunStatus::Running,
            start_time: Utc::now(),
            tags: request.tags().clone(),
            metrics: BTreeMap::new(),
        };
        state.runs.insert(run.run_id.clone(), run.clone());
        Ok(run)
    }

    fn set_tag(&self, run_id: &str, key: &str, value: &str) -> TrackingResult<()> {
        let mut state = self.state.lock().expect("tracking state poisoned");
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        run.tags.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn search_runs(
        &self,
        experiment_ids: &[String],
        filter: &RunFilter,
        max_results: usize,
        order: RunOrder,
    ) -> TrackingResult<Vec<Run>> {
        let state = self.state.lock().expect("tracking state poisoned");
        let mut matches: Vec<Run> = state
            .runs
            .values()
            .filter(|run| experiment_ids.is_empty() || experiment_ids.contains(&run.experiment_id))
            .filter(|run| filter.matches(run))
            .cloned()
            .collect();
        match order {
            RunOrder::StartTimeDesc => matches.sort_by(|a, b| b.start_time.cmp(&a.start_time)),
            RunOrder::StartTimeAsc => matches.sort_by(|a, b| a.start_time.cmp(&b.start_time)),
        }
        matches.truncate(max_results);
        Ok(matches)
    }

    fn list_experiments(&self) -> TrackingResult<Vec<Experiment>> {
        let state = self.state.lock().expect("tracking state poisoned");
        Ok(state.experiments.clone())
    }

    fn list_artifacts(&self, run_id: &str) -> TrackingResult<Vec<String>> {
        let root = self.artifact_root(run_id)?;
        let mut paths = Vec::new();
        collect_relative_paths(&root, &root, &mut paths)?;
        paths.sort();
        Ok(paths)
    }

    fn download_artifacts(
        &self,
        run_id: &str,
        artifact_path: &str,
        dst: &Path,
    ) -> TrackingResult<PathBuf> {
        let root = self.artifact_root(run_id)?;
        let source = root.join(artifact_path);
        if !source.exists() {
            return Err(TrackingError::Backend(format!(
                "artifact {artifact_path} not found for run {run_id}"
            )));
        }
        let target = dst.join(
            source
                .file_name()
                .ok_or_else(|| TrackingError::Backend("artifact path has no file name".to_string()))?,
        );
        copy_recursively(&source, &target)?;
        Ok(target)
    }
}

fn collect_relative_paths(root: &Path, dir: &Path, out: &mut Vec<String>) -> TrackingResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_relative_paths(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

fn copy_recursively(source: &Path, target: &Path) -> TrackingResult<()> {
    if source.is_dir() {
        std::fs::create_dir_all(target)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &target.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(source, target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_search_runs() {
        let client = InMemoryTrackingClient::new("memory://test");
        let experiment_id = client.create_experiment("resume-ner");

        let run = client
            .create_run(
                CreateRunRequest::new(&experiment_id, "hpo-distilbert-ab12cd34")
                    .unwrap()
                    .with_tag("k", "v"),
            )
            .unwrap();

        let found = client
            .search_runs(
                &[experiment_id],
                &RunFilter::default().tag("k", "v"),
                10,
                RunOrder::StartTimeDesc,
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].run_id, run.run_id);
    }

    #[test]
    fn test_artifact_listing_and_download() {
        let client = InMemoryTrackingClient::new("memory://test");
        let experiment_id = client.create_experiment("resume-ner");
        let run = client
            .create_run(CreateRunRequest::new(&experiment_id, "final").unwrap())
            .unwrap();

        let artifacts = TempDir::new().unwrap();
        std::fs::create_dir_all(artifacts.path().join("checkpoint")).unwrap();
        std::fs::write(artifacts.path().join("checkpoint/config.json"), "{}").unwrap();
        client.put_artifact_root(&run.run_id, artifacts.path());

        let listed = client.list_artifacts(&run.run_id).unwrap();
        assert_eq!(listed, vec!["checkpoint/config.json".to_string()]);

        let dst = TempDir::new().unwrap();
        let downloaded = client
            .download_artifacts(&run.run_id, "checkpoint", dst.path())
            .unwrap();
        assert!(downloaded.join("config.json").exists());
    }
}
