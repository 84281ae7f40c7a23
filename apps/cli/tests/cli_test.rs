//! End-to-end CLI checks over a temp workspace.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PIPELINE_YAML: &str = r#"
data:
  name: resume_ner
  version: "1.0"
  split_seed: 7
hpo:
  search_space:
    learning_rate:
      low: 1.0e-5
      high: 1.0e-3
  objective:
    metric: macro-f1
  seed_policy:
    seed: 42
training:
  budget:
    max_steps: 1000
evaluation:
  metric: macro-f1
"#;

fn trellis() -> Command {
    Command::cargo_bin("trellis").unwrap()
}

#[test]
fn test_study_key_is_reproducible_and_model_sensitive() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("pipeline.yaml");
    std::fs::write(&config, PIPELINE_YAML).unwrap();

    let run = |model: &str| -> String {
        let output = trellis()
            .args(["key", "study", "-c"])
            .arg(&config)
            .args(["--model", model])
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    };

    let distilbert_a = run("distilbert");
    let distilbert_b = run("distilbert");
    let bert = run("bert");
    assert_eq!(distilbert_a, distilbert_b);
    assert_ne!(distilbert_a, bert);

    let hash = distilbert_a.split_whitespace().next().unwrap();
    assert_eq!(hash.len(), 64);
}

#[test]
fn test_counter_reserve_commit_cycle() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().to_str().unwrap().to_string();
    let key = "resume-ner:hpo:ab12cd34:local";

    for expected in ["1", "2", "3"] {
        trellis()
            .args(["-w", &workspace, "counter", "reserve", key])
            .assert()
            .success()
            .stdout(predicate::str::contains(expected));
        trellis()
            .args(["-w", &workspace, "counter", "commit", key, expected, "run-x"])
            .assert()
            .success();
    }

    // monotonic without a commit
    trellis()
        .args(["-w", &workspace, "counter", "reserve", key])
        .assert()
        .success()
        .stdout(predicate::str::contains("4"));
}

#[test]
fn test_trial_key_rejects_bad_hash() {
    let temp = TempDir::new().unwrap();
    let params = temp.path().join("params.yaml");
    std::fs::write(&params, "learning_rate: 3.0e-5\n").unwrap();

    trellis()
        .args(["key", "trial", "--study-hash", "not-a-hash", "-p"])
        .arg(&params)
        .assert()
        .failure();
}

#[test]
fn test_empty_index_listing() {
    let temp = TempDir::new().unwrap();
    trellis()
        .args(["-w", temp.path().to_str().unwrap(), "index", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("index is empty"));
}
