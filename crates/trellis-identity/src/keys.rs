//! Study, study-family and trial key builders.
//!
//! A key is a canonical JSON document assembled from configuration
//! fragments; its hash is the only thing ever persisted or tagged. Builders
//! are pure: no filesystem, no clock, no tracking server. Two schema
//! generations coexist:
//!
//! - **v1** binds the raw dataset config (including its on-disk path), the
//!   search space, the objective, the model and optionally the benchmark
//!   config.
//! - **v2** binds content fingerprints for data and evaluation instead of
//!   raw blobs, an explicit objective direction, the training budget and the
//!   seed policy. Benchmark config is excluded: ranking is a downstream
//!   phase and must not fragment training identity.
//!
//! v1 and v2 hashes are never comparable; every consumer checks the schema
//! label before trusting a hash.

use crate::error::{IdentityError, IdentityResult};
use crate::hash::{hash_json, HashLength};
use crate::hparams::normalize_hparams;
use serde_json::{json, Map, Value};
use tracing::warn;

pub type ConfigMap = Map<String, Value>;

/// Which builder produced a digest. Written as the schema tag on every run
/// and checked at every consumption point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySchema {
    StudyV1,
    StudyV2,
    StudyFamilyV2,
    Trial,
}

impl KeySchema {
    /// Stable label used for the schema-version run tag.
    pub fn label(self) -> &'static str {
        match self {
            KeySchema::StudyV1 => "study-v1",
            KeySchema::StudyV2 => "study-v2",
            KeySchema::StudyFamilyV2 => "study-family-v2",
            KeySchema::Trial => "trial-v1",
        }
    }
}

impl std::fmt::Display for KeySchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A computed key: the canonical document plus its full hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDigest {
    pub schema: KeySchema,
    pub canonical_json: String,
    pub hash: String,
}

impl KeyDigest {
    fn new(schema: KeySchema, document: Value) -> Self {
        let hash = hash_json(&document, HashLength::Full);
        let canonical_json = crate::canonical::canonical_json_string(&document);
        Self { schema, canonical_json, hash }
    }

    /// 8-character prefix used in human-readable run names.
    pub fn name_prefix(&self) -> &str {
        &self.hash[..8]
    }
}

/// Inputs for the legacy v1 study key.
#[derive(Debug, Clone)]
pub struct StudyKeyV1Inputs<'a> {
    pub dataset: &'a ConfigMap,
    pub search_space: &'a ConfigMap,
    pub objective: &'a ConfigMap,
    pub model: &'a str,
    pub benchmark: Option<&'a ConfigMap>,
}

/// Inputs for the v2 study key. `data_fingerprint` and `eval_fingerprint`
/// are supplied by the caller, not derived here: parent and child runs must
/// call the same fingerprint functions against the same config and pass the
/// same strings, otherwise silent recomputation drift would split identity.
#[derive(Debug, Clone)]
pub struct StudyKeyV2Inputs<'a> {
    pub search_space: &'a ConfigMap,
    pub objective: &'a ConfigMap,
    pub training_budget: &'a ConfigMap,
    pub seed_policy: &'a ConfigMap,
    pub model: &'a str,
    pub data_fingerprint: &'a str,
    pub eval_fingerprint: &'a str,
}

pub fn build_study_key_v1(inputs: &StudyKeyV1Inputs<'_>) -> IdentityResult<KeyDigest> {
    let mut document = json!({
        "schema_version": 1,
        "data": Value::Object(inputs.dataset.clone()),
        "hpo": {
            "search_space": Value::Object(inputs.search_space.clone()),
            "objective": Value::Object(inputs.objective.clone()),
        },
        "model": inputs.model,
    });
    if let Some(benchmark) = inputs.benchmark {
        document["benchmark"] = Value::Object(benchmark.clone());
    }
    Ok(KeyDigest::new(KeySchema::StudyV1, document))
}

pub fn build_study_key_v2(inputs: &StudyKeyV2Inputs<'_>) -> IdentityResult<KeyDigest> {
    Ok(KeyDigest::new(
        KeySchema::StudyV2,
        v2_document(inputs, Some(inputs.model))?,
    ))
}

/// The study-family key omits the model so that studies across backbones
/// (e.g. distilbert vs. bert) group under one family.
pub fn build_study_family_key(inputs: &StudyKeyV2Inputs<'_>) -> IdentityResult<KeyDigest> {
    Ok(KeyDigest::new(
        KeySchema::StudyFamilyV2,
        v2_document(inputs, None)?,
    ))
}

fn v2_document(inputs: &StudyKeyV2Inputs<'_>, model: Option<&str>) -> IdentityResult<Value> {
    validate_fingerprint("data_fingerprint", inputs.data_fingerprint)?;
    validate_fingerprint("eval_fingerprint", inputs.eval_fingerprint)?;

    let mut document = json!({
        "schema_version": 2,
        "data": {"fingerprint": inputs.data_fingerprint},
        "evaluation": {"fingerprint": inputs.eval_fingerprint},
        "hpo": {
            "search_space": Value::Object(inputs.search_space.clone()),
            "objective": Value::Object(objective_with_direction(inputs.objective)?),
            "seed_policy": Value::Object(inputs.seed_policy.clone()),
        },
        "training": {"budget": Value::Object(inputs.training_budget.clone())},
    });
    if let Some(model) = model {
        document["model"] = Value::String(model.to_string());
    }
    Ok(document)
}

/// Trial key: the study key hash plus the normalized hyperparameters.
///
/// The hash argument is validated rather than trusted. A placeholder or
/// test double leaking into this boundary would silently corrupt trial
/// grouping, so anything that is not hex of a plausible digest length is
/// rejected loudly.
pub fn build_trial_key(study_key_hash: &str, hparams: &ConfigMap) -> IdentityResult<KeyDigest> {
    validate_study_key_hash(study_key_hash)?;
    let normalized = normalize_hparams(hparams);
    let document = json!({
        "study_key_hash": study_key_hash,
        "hyperparameters": Value::Object(normalized),
    });
    Ok(KeyDigest::new(KeySchema::Trial, document))
}

/// Resolve the objective direction, migrating the legacy `goal` key.
///
/// Direction affects comparison semantics (min vs. max), so `goal` is never
/// silently dropped; it is carried over with a deprecation warning. When
/// neither key is present the direction defaults to `maximize` (the
/// pipeline's objective metrics are F-scores).
fn objective_with_direction(objective: &ConfigMap) -> IdentityResult<ConfigMap> {
    let mut out = objective.clone();
    let direction = match (out.remove("direction"), out.remove("goal")) {
        (Some(direction), _) => parse_direction(&direction)?,
        (None, Some(goal)) => {
            warn!("objective key 'goal' is deprecated, use 'direction'");
            parse_direction(&goal)?
        }
        (None, None) => "maximize".to_string(),
    };
    out.insert("direction".to_string(), Value::String(direction));
    Ok(out)
}

fn parse_direction(value: &Value) -> IdentityResult<String> {
    let raw = value
        .as_str()
        .ok_or_else(|| IdentityError::InvalidObjective(format!("direction must be a string, got {value}")))?;
    match raw.trim().to_lowercase().as_str() {
        "minimize" | "min" => Ok("minimize".to_string()),
        "maximize" | "max" => Ok("maximize".to_string()),
        other => Err(IdentityError::InvalidObjective(format!(
            "direction must be 'minimize' or 'maximize', got '{other}'"
        ))),
    }
}

fn validate_fingerprint(field: &str, value: &str) -> IdentityResult<()> {
    if value.trim().is_empty() || value.chars().any(char::is_whitespace) {
        return Err(IdentityError::InvalidFingerprint(format!(
            "{field} must be a non-empty token without whitespace"
        )));
    }
    Ok(())
}

fn validate_study_key_hash(hash: &str) -> IdentityResult<()> {
    if hash.len() < 16 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(IdentityError::InvalidKeyHash(format!(
            "expected a hex digest of at least 16 characters, got '{hash}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> ConfigMap {
        value.as_object().cloned().unwrap()
    }

    fn v2_inputs<'a>(
        search_space: &'a ConfigMap,
        objective: &'a ConfigMap,
        budget: &'a ConfigMap,
        seed: &'a ConfigMap,
        model: &'a str,
        data_fp: &'a str,
        eval_fp: &'a str,
    ) -> StudyKeyV2Inputs<'a> {
        StudyKeyV2Inputs {
            search_space,
            objective,
            training_budget: budget,
            seed_policy: seed,
            model,
            data_fingerprint: data_fp,
            eval_fingerprint: eval_fp,
        }
    }

    #[test]
    fn test_v1_key_is_deterministic() {
        let dataset = as_map(json!({"name": "resume_ner", "path": "/data/resume"}));
        let space = as_map(json!({"learning_rate": {"low": 1e-5, "high": 1e-3}}));
        let objective = as_map(json!({"metric": "macro-f1"}));
        let inputs = StudyKeyV1Inputs {
            dataset: &dataset,
            search_space: &space,
            objective: &objective,
            model: "distilbert",
            benchmark: None,
        };
        let a = build_study_key_v1(&inputs).unwrap();
        let b = build_study_key_v1(&inputs).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
    }

    #[test]
    fn test_benchmark_changes_v1_but_not_v2() {
        let dataset = as_map(json!({"name": "resume_ner"}));
        let space = as_map(json!({"lr": [1, 2]}));
        let objective = as_map(json!({"metric": "macro-f1"}));
        let bench_a = as_map(json!({"ranking": "mean"}));
        let bench_b = as_map(json!({"ranking": "median"}));

        let v1_a = build_study_key_v1(&StudyKeyV1Inputs {
            dataset: &dataset,
            search_space: &space,
            objective: &objective,
            model: "distilbert",
            benchmark: Some(&bench_a),
        })
        .unwrap();
        let v1_b = build_study_key_v1(&StudyKeyV1Inputs {
            dataset: &dataset,
            search_space: &space,
            objective: &objective,
            model: "distilbert",
            benchmark: Some(&bench_b),
        })
        .unwrap();
        assert_ne!(v1_a.hash, v1_b.hash);

        // v2 has no benchmark section at all
        let budget = as_map(json!({"max_steps": 1000}));
        let seed = as_map(json!({"seed": 42}));
        let fp = "d".repeat(64);
        let efp = "e".repeat(64);
        let v2 =
            build_study_key_v2(&v2_inputs(&space, &objective, &budget, &seed, "distilbert", &fp, &efp))
                .unwrap();
        assert!(!v2.canonical_json.contains("benchmark"));
    }

    #[test]
    fn test_goal_migrates_to_direction() {
        let space = as_map(json!({}));
        let budget = as_map(json!({"max_steps": 100}));
        let seed = as_map(json!({}));
        let fp = "a".repeat(64);
        let with_goal = as_map(json!({"metric": "macro-f1", "goal": "minimize"}));
        let with_direction = as_map(json!({"metric": "macro-f1", "direction": "minimize"}));

        let a = build_study_key_v2(&v2_inputs(&space, &with_goal, &budget, &seed, "bert", &fp, &fp))
            .unwrap();
        let b =
            build_study_key_v2(&v2_inputs(&space, &with_direction, &budget, &seed, "bert", &fp, &fp))
                .unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_direction_changes_v2_hash() {
        let space = as_map(json!({}));
        let budget = as_map(json!({"max_steps": 100}));
        let seed = as_map(json!({}));
        let fp = "a".repeat(64);
        let min = as_map(json!({"metric": "loss", "direction": "minimize"}));
        let max = as_map(json!({"metric": "loss", "direction": "maximize"}));

        let a = build_study_key_v2(&v2_inputs(&space, &min, &budget, &seed, "bert", &fp, &fp)).unwrap();
        let b = build_study_key_v2(&v2_inputs(&space, &max, &budget, &seed, "bert", &fp, &fp)).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_family_key_ignores_model() {
        let space = as_map(json!({"lr": [1]}));
        let objective = as_map(json!({"metric": "macro-f1"}));
        let budget = as_map(json!({"max_steps": 100}));
        let seed = as_map(json!({}));
        let fp = "c".repeat(64);

        let a = build_study_family_key(&v2_inputs(&space, &objective, &budget, &seed, "distilbert", &fp, &fp))
            .unwrap();
        let b = build_study_family_key(&v2_inputs(&space, &objective, &budget, &seed, "bert", &fp, &fp))
            .unwrap();
        assert_eq!(a.hash, b.hash);

        let v2 = build_study_key_v2(&v2_inputs(&space, &objective, &budget, &seed, "bert", &fp, &fp))
            .unwrap();
        assert_ne!(a.hash, v2.hash);
    }

    #[test]
    fn test_trial_key_rejects_placeholder_hash() {
        let hparams = as_map(json!({"lr": 0.001}));
        assert!(build_trial_key("", &hparams).is_err());
        assert!(build_trial_key("not-a-hash", &hparams).is_err());
        assert!(build_trial_key("abc", &hparams).is_err());
    }

    #[test]
    fn test_trial_key_ignores_run_metadata() {
        let study_hash = "f".repeat(64);
        let a = as_map(json!({"lr": 0.001, "run_id": "r-1", "trial_number": 3}));
        let b = as_map(json!({"lr": 0.001, "run_id": "r-2", "trial_number": 9}));
        let ka = build_trial_key(&study_hash, &a).unwrap();
        let kb = build_trial_key(&study_hash, &b).unwrap();
        assert_eq!(ka.hash, kb.hash);
    }

    #[test]
    fn test_invalid_direction_is_rejected() {
        let space = as_map(json!({}));
        let objective = as_map(json!({"metric": "macro-f1", "direction": "sideways"}));
        let budget = as_map(json!({}));
        let seed = as_map(json!({}));
        let fp = "a".repeat(64);
        let result =
            build_study_key_v2(&v2_inputs(&space, &objective, &budget, &seed, "bert", &fp, &fp));
        assert!(matches!(result, Err(IdentityError::InvalidObjective(_))));
    }
}
