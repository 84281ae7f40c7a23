//! Checkpoint validation.

use std::path::Path;

use tracing::debug;

/// Model-weight filenames any usable checkpoint directory carries one of.
pub const WEIGHT_FILENAMES: &[&str] = &[
    "model.safetensors",
    "pytorch_model.bin",
    "model.onnx",
];

/// Companion config accepted in place of a weight file (weights may live in
/// sharded files the trainer knows how to reassemble).
pub const CHECKPOINT_CONFIG_FILENAME: &str = "config.json";

/// A directory passes when it contains a known weight file *or* the
/// companion config file.
#[must_use]
pub fn is_valid_checkpoint_dir(path: &Path) -> bool {
    if !path.is_dir() {
        debug!(path = %path.display(), "checkpoint candidate is not a directory");
        return false;
    }
    let has_weights = WEIGHT_FILENAMES
        .iter()
        .any(|name| path.join(name).is_file());
    let has_config = path.join(CHECKPOINT_CONFIG_FILENAME).is_file();
    if !has_weights && !has_config {
        debug!(path = %path.display(), "checkpoint candidate has neither weights nor config");
    }
    has_weights || has_config
}
