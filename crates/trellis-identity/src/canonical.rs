//! Canonical JSON rendering.
//!
//! Two JSON documents are considered identical iff their canonical rendering
//! is byte-identical: object keys sorted, no extraneous whitespace, numbers
//! in serde_json's shortest round-trip form. This rendering is the sole
//! definition of "same experiment" across the identity subsystem, so it must
//! never depend on map iteration order or platform.

use crate::error::IdentityResult;
use serde::Serialize;
use serde_json::Value;

/// Render any serializable value as canonical JSON bytes.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> IdentityResult<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    write_canonical(&value, &mut out);
    Ok(out)
}

/// Render an already-parsed JSON value as a canonical string.
///
/// Infallible: a `Value` is always representable, and non-finite floats were
/// already coerced to null when the value was built.
pub fn canonical_json_string(value: &Value) -> String {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    // write_canonical only emits serde_json-escaped fragments, all UTF-8
    String::from_utf8(out).unwrap_or_default()
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            out.extend_from_slice(value.to_string().as_bytes());
        }
        Value::String(s) => {
            out.extend_from_slice(Value::String(s.clone()).to_string().as_bytes());
        }
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // serde_json's default map is sorted, but we re-sort explicitly so
            // canonical output survives a `preserve_order` feature unification.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String((*key).clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push(b'}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_sorts_keys_and_strips_whitespace() {
        let value = json!({"b": 1, "a": {"z": [1, 2], "y": "s"}});
        assert_eq!(
            canonical_json_string(&value),
            r#"{"a":{"y":"s","z":[1,2]},"b":1}"#
        );
    }

    #[test]
    fn test_canonical_is_stable_across_calls() {
        let value = json!({"nested": {"c": 3, "a": 1, "b": 2}, "list": [true, null]});
        assert_eq!(canonical_json_string(&value), canonical_json_string(&value));
    }

    #[test]
    fn test_canonical_escapes_strings() {
        let value = json!({"k": "line\nbreak"});
        assert_eq!(canonical_json_string(&value), r#"{"k":"line\nbreak"}"#);
    }
}
