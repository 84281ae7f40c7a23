//! End-to-end identity scenarios across hashing, normalization and key
//! builders.

use serde_json::{json, Map, Value};
use trellis_identity::{
    build_study_key_v2, build_trial_key, data_fingerprint, hash_full, hash_short, normalize_hparams,
    StudyKeyV2Inputs,
};

fn as_map(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_study_key_v2_end_to_end() {
    let search_space = as_map(json!({
        "learning_rate": {"low": 1e-5, "high": 1e-3, "log": true},
        "batch_size": [16, 32],
    }));
    let objective = as_map(json!({"metric": "macro-f1"}));
    let budget = as_map(json!({"max_steps": 1000}));
    let seed_policy = as_map(json!({"seed": 42, "per_trial": "fixed"}));
    let data_fp = "d".repeat(64);
    let eval_fp = "e".repeat(64);

    let build = |model: &str| {
        build_study_key_v2(&StudyKeyV2Inputs {
            search_space: &search_space,
            objective: &objective,
            training_budget: &budget,
            seed_policy: &seed_policy,
            model,
            data_fingerprint: &data_fp,
            eval_fingerprint: &eval_fp,
        })
        .unwrap()
    };

    let first = build("distilbert");
    let second = build("distilbert");
    assert_eq!(first.hash, second.hash);
    assert_eq!(first.hash.len(), 64);
    assert!(first.hash.chars().all(|c| c.is_ascii_hexdigit()));

    let other_model = build("bert");
    assert_ne!(first.hash, other_model.hash);
}

#[test]
fn test_trial_key_composes_with_study_key() {
    let study_hash = hash_full("study");
    let hparams = as_map(json!({"learning_rate": 3e-5, "batch_size": 32}));
    let trial = build_trial_key(&study_hash, &hparams).unwrap();

    // normalization happens inside the builder: a noisy float representation
    // of the same hyperparameters lands on the same trial
    let noisy = as_map(json!({"learning_rate": 3.0000000000000004e-5, "batch_size": 32}));
    let trial_noisy = build_trial_key(&study_hash, &noisy).unwrap();
    assert_eq!(trial.hash, trial_noisy.hash);

    // a different study hash is a different trial
    let other = build_trial_key(&hash_full("other-study"), &hparams).unwrap();
    assert_ne!(trial.hash, other.hash);
}

#[test]
fn test_truncation_is_a_prefix_everywhere() {
    for input in ["resume_ner", "proj:hpo:abc:local", ""] {
        assert_eq!(hash_short(input), hash_full(input)[..16]);
    }
}

#[test]
fn test_normalize_is_idempotent_over_fingerprint_inputs() {
    let dataset = as_map(json!({
        "name": "resume_ner",
        "version": "1.0",
        "split_seed": 7,
    }));
    let fp1 = data_fingerprint(&dataset);
    let fp2 = data_fingerprint(&dataset);
    assert_eq!(fp1, fp2);

    let hparams = as_map(json!({"x": 0.1_f64 + 0.2_f64}));
    let once = normalize_hparams(&hparams);
    assert_eq!(once, normalize_hparams(&once));
}
