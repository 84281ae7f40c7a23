//! Checkpoint archive extraction.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::error::{ArtifactError, ArtifactResult};

/// Whether a downloaded artifact looks like a compressed checkpoint
/// archive.
#[must_use]
pub fn is_archive(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Extract a `.tar.gz` archive under `dst` and return the checkpoint root.
///
/// Archives produced by training jobs usually wrap everything in a single
/// top-level directory; when exactly one directory comes out, that
/// directory is the root. Otherwise the extraction directory itself is.
pub fn extract_archive(archive_path: &Path, dst: &Path) -> ArtifactResult<PathBuf> {
    std::fs::create_dir_all(dst)?;
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.unpack(dst).map_err(|e| ArtifactError::Archive {
        path: archive_path.display().to_string(),
        reason: e.to_string(),
    })?;

    let entries: Vec<PathBuf> = std::fs::read_dir(dst)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect();
    match entries.as_slice() {
        [single] if single.is_dir() => {
            debug!(root = %single.display(), "archive has a single common root");
            Ok(single.clone())
        }
        _ => Ok(dst.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn build_archive(dst: &Path, entries: &[(&str, &str)]) {
        let file = File::create(dst).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, contents.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_single_root_is_detected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("ckpt.tar.gz");
        build_archive(
            &archive,
            &[
                ("checkpoint/config.json", "{}"),
                ("checkpoint/model.safetensors", "w"),
            ],
        );

        let out = temp.path().join("out");
        let root = extract_archive(&archive, &out).unwrap();
        assert_eq!(root, out.join("checkpoint"));
        assert!(root.join("config.json").exists());
    }

    #[test]
    fn test_flat_archive_returns_extraction_dir() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("flat.tgz");
        build_archive(&archive, &[("config.json", "{}"), ("model.onnx", "w")]);

        let out = temp.path().join("out");
        let root = extract_archive(&archive, &out).unwrap();
        assert_eq!(root, out);
        assert!(out.join("model.onnx").exists());
    }

    #[test]
    fn test_archive_detection() {
        assert!(is_archive(Path::new("a/checkpoint.tar.gz")));
        assert!(is_archive(Path::new("checkpoint.tgz")));
        assert!(!is_archive(Path::new("model.safetensors")));
    }

    #[test]
    fn test_corrupt_archive_is_reported() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.tar.gz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();
        let result = extract_archive(&archive, &temp.path().join("out"));
        assert!(matches!(result, Err(ArtifactError::Archive { .. })));
    }
}
