//! Content fingerprints for dataset and evaluation configuration.
//!
//! Fingerprints exist because raw config blobs fragment identity: the same
//! dataset mounted at `/content/data` on a hosted notebook and `~/data`
//! locally must fingerprint identically. A fingerprint is computed once by
//! the caller and passed explicitly into the v2 key builders; builders never
//! recompute it internally.

use crate::hash::{hash_json, HashLength};
use serde_json::{Map, Value};

/// Keys whose values already are a content/manifest hash. When one is
/// present it wins over any projection.
const CONTENT_HASH_KEYS: &[&str] = &["content_hash", "manifest_hash"];

/// Semantic fields of a dataset config. Everything else (storage hints,
/// local paths, loader tuning) is irrelevant to what the data *is*.
const DATA_PROJECTION_KEYS: &[&str] = &[
    "name",
    "version",
    "split_seed",
    "label_mapping",
    "labels",
    "schema",
];

/// Fingerprint a dataset configuration.
///
/// Prefers an already-present content/manifest hash; otherwise hashes the
/// reduced semantic projection of the config. Never hashes the raw blob.
pub fn data_fingerprint(config: &Map<String, Value>) -> String {
    for key in CONTENT_HASH_KEYS {
        if let Some(Value::String(existing)) = config.get(*key) {
            if !existing.trim().is_empty() {
                return existing.trim().to_string();
            }
        }
    }
    let mut projection = Map::new();
    for key in DATA_PROJECTION_KEYS {
        if let Some(value) = config.get(*key) {
            projection.insert((*key).to_string(), value.clone());
        }
    }
    hash_json(&Value::Object(projection), HashLength::Full)
}

/// Fingerprint an evaluation configuration.
///
/// Drops filesystem-flavored fields (they differ per execution platform)
/// and hashes the rest.
pub fn eval_fingerprint(config: &Map<String, Value>) -> String {
    let mut projection = Map::new();
    for (key, value) in config {
        if is_path_like(key) {
            continue;
        }
        projection.insert(key.clone(), value.clone());
    }
    hash_json(&Value::Object(projection), HashLength::Full)
}

fn is_path_like(key: &str) -> bool {
    key.ends_with("_path")
        || key.ends_with("_dir")
        || key.ends_with("_uri")
        || key == "paths"
        || key == "root"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_existing_content_hash_wins() {
        let config = as_map(json!({
            "name": "resume_ner",
            "content_hash": "ab12cd34",
        }));
        assert_eq!(data_fingerprint(&config), "ab12cd34");
    }

    #[test]
    fn test_projection_ignores_storage_hints() {
        let a = as_map(json!({
            "name": "resume_ner",
            "version": "1.0",
            "cache_dir": "/content/drive/data",
        }));
        let b = as_map(json!({
            "name": "resume_ner",
            "version": "1.0",
            "cache_dir": "/home/ci/data",
        }));
        assert_eq!(data_fingerprint(&a), data_fingerprint(&b));
    }

    #[test]
    fn test_projection_sees_semantic_changes() {
        let a = as_map(json!({"name": "resume_ner", "version": "1.0"}));
        let b = as_map(json!({"name": "resume_ner", "version": "1.1"}));
        assert_ne!(data_fingerprint(&a), data_fingerprint(&b));
    }

    #[test]
    fn test_eval_fingerprint_drops_paths() {
        let a = as_map(json!({"metric": "macro-f1", "report_path": "/tmp/a"}));
        let b = as_map(json!({"metric": "macro-f1", "report_path": "/var/b"}));
        assert_eq!(eval_fingerprint(&a), eval_fingerprint(&b));
        let c = as_map(json!({"metric": "micro-f1"}));
        assert_ne!(eval_fingerprint(&a), eval_fingerprint(&c));
    }
}
