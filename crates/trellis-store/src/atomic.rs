//! Atomic JSON persistence.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Write a value as pretty JSON via temp file + atomic rename.
///
/// The temp file lives in the destination directory so the rename never
/// crosses a filesystem boundary. On Windows rename cannot overwrite, so the
/// destination is unlinked first; the lock held by callers makes the
/// unlink/rename pair safe against concurrent writers.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;

    let temp_filename = format!(
        "{}.tmp.{}",
        path.file_stem().and_then(|s| s.to_str()).unwrap_or("store"),
        Uuid::new_v4()
    );
    let temp_path = path.with_file_name(temp_filename);

    if let Err(e) = std::fs::write(&temp_path, json) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    #[cfg(windows)]
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Read a JSON file, treating an absent file as the default value.
///
/// Parse failures propagate as [`StoreError::Corrupt`]; whether to degrade
/// or abort on corruption is the caller's call.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> StoreResult<T> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&contents).map_err(|source| {
        warn!(path = %path.display(), error = %source, "store file failed to parse");
        StoreError::Corrupt {
            path: path.display().to_string(),
            source,
        }
    })
}
