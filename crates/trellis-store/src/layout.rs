use std::path::{Path, PathBuf};

use crate::counter::COUNTER_FILENAME;
use crate::error::StoreResult;
use crate::index::INDEX_FILENAME;

/// Filesystem layout for the project-local cache.
///
/// Default layout is under `.trellis/_internals/cache/` inside a workspace:
/// the two JSON coordination files at the top, checkpoint caches keyed by
/// run id and by identity hash below.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create a layout rooted in a Trellis workspace root.
    #[must_use]
    pub fn for_workspace_root(workspace_root: &Path) -> Self {
        Self::new(
            workspace_root
                .join(".trellis")
                .join("_internals")
                .join("cache"),
        )
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILENAME)
    }

    #[must_use]
    pub fn counter_path(&self) -> PathBuf {
        self.root.join(COUNTER_FILENAME)
    }

    /// Checkpoint cache keyed by tracked run id.
    #[must_use]
    pub fn run_checkpoint_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("checkpoints").join("by-run").join(run_id)
    }

    /// Checkpoint cache keyed by identity hash.
    #[must_use]
    pub fn hash_checkpoint_dir(&self, key_hash: &str) -> PathBuf {
        self.root.join("checkpoints").join("by-key").join(key_hash)
    }

    /// Root of the legacy hyperparameter-search output layout
    /// (`sweeps/<study_hash>/trial_<n>/checkpoint`).
    #[must_use]
    pub fn legacy_sweep_dir(&self) -> PathBuf {
        self.root.join("sweeps")
    }

    pub fn ensure_dirs(&self) -> StoreResult<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.root.join("checkpoints").join("by-run"))?;
        std::fs::create_dir_all(self.root.join("checkpoints").join("by-key"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let temp = TempDir::new().unwrap();
        let layout = CacheLayout::for_workspace_root(temp.path());

        assert!(layout.root().to_string_lossy().contains(".trellis"));
        assert!(layout.index_path().ends_with("mlflow_index.json"));
        assert!(layout.counter_path().ends_with("run_name_counter.json"));
        assert!(layout
            .run_checkpoint_dir("run-1")
            .to_string_lossy()
            .contains("by-run"));
    }
}
