//! Secondary backup store.
//!
//! On the hosted-notebook platform a persistent drive survives VM resets
//! while the local disk does not; checkpoints are mirrored there and can be
//! restored when the local cache is gone. The seam is a trait so tests and
//! other platforms can plug their own store (or none).

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ArtifactResult;

pub trait BackupStore: Send + Sync {
    /// Map a local cache path to its location in the backup store, if the
    /// path is inside the mirrored tree.
    fn path_for(&self, local_path: &Path) -> Option<PathBuf>;

    /// Restore `remote_path` to `dst`. Returns false when the backup does
    /// not have the path.
    fn restore(&self, remote_path: &Path, dst: &Path, is_directory: bool) -> ArtifactResult<bool>;
}

/// A backup store that mirrors a local root under a backup root
/// (e.g. `/content/drive/MyDrive/trellis` for a notebook drive mount).
#[derive(Debug, Clone)]
pub struct DirectoryBackupStore {
    local_root: PathBuf,
    backup_root: PathBuf,
}

impl DirectoryBackupStore {
    #[must_use]
    pub fn new(local_root: PathBuf, backup_root: PathBuf) -> Self {
        Self { local_root, backup_root }
    }
}

impl BackupStore for DirectoryBackupStore {
    fn path_for(&self, local_path: &Path) -> Option<PathBuf> {
        let relative = local_path.strip_prefix(&self.local_root).ok()?;
        Some(self.backup_root.join(relative))
    }

    fn restore(&self, remote_path: &Path, dst: &Path, is_directory: bool) -> ArtifactResult<bool> {
        if !remote_path.exists() {
            debug!(path = %remote_path.display(), "backup store has no copy");
            return Ok(false);
        }
        if is_directory {
            copy_dir(remote_path, dst)?;
        } else {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(remote_path, dst)?;
        }
        Ok(true)
    }
}

fn copy_dir(source: &Path, target: &Path) -> ArtifactResult<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let entry_target = target.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &entry_target)?;
        } else {
            std::fs::copy(entry.path(), &entry_target)?;
        }
    }
    Ok(())
}
