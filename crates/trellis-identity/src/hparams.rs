//! Hyperparameter normalization.
//!
//! Trial identity must not change because a float was printed differently, a
//! string gained a trailing space, or an orchestration field (run id, trial
//! number) rode along in the hyperparameter dict. Normalization maps any raw
//! hyperparameter mapping to the canonical form that gets hashed.
//!
//! Guarantees:
//! - idempotent: `normalize(normalize(x)) == normalize(x)`
//! - order-insensitive: key order never affects the downstream hash
//! - floats are re-rendered at 12 significant figures, absorbing
//!   representation noise below that threshold

use crate::canonical::canonical_json_string;
use serde_json::{Map, Value};

/// Significant figures kept when re-rendering floats.
const FLOAT_SIG_FIGS: usize = 12;

/// Orchestration fields that identify *where* a trial ran, not *what* it
/// ran. They must never contribute to trial identity.
const METADATA_KEYS: &[&str] = &[
    "run_id",
    "run_name",
    "trial_id",
    "trial_number",
    "experiment_id",
    "tracking_uri",
];

/// Normalize a raw hyperparameter mapping for stable hashing.
pub fn normalize_hparams(raw: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in raw {
        if METADATA_KEYS.contains(&key.as_str()) {
            continue;
        }
        out.insert(key.clone(), normalize_value(value));
    }
    out
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) => value.clone(),
        Value::Number(n) => {
            if n.is_f64() {
                normalize_float(n.as_f64().unwrap_or_default())
            } else {
                value.clone()
            }
        }
        Value::String(s) => Value::String(normalize_string(s)),
        // Structured values are stringified and normalized like any other
        // non-scalar so that e.g. nested schedule configs hash stably.
        other => Value::String(normalize_string(&canonical_json_string(other))),
    }
}

fn normalize_float(f: f64) -> Value {
    if !f.is_finite() {
        return Value::String(normalize_string(&f.to_string()));
    }
    let rendered = format!("{:.*e}", FLOAT_SIG_FIGS - 1, f);
    match rendered.parse::<f64>() {
        Ok(parsed) => serde_json::Number::from_f64(parsed)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Err(_) => Value::Null,
    }
}

fn normalize_string(s: &str) -> String {
    s.trim().to_lowercase()
}
