//! Tag vocabulary and sanitization.
//!
//! Tag keys are namespaced under `trellis.` so pipeline tags never collide
//! with user tags or backend-reserved keys. The schema tag is written on
//! every run and checked at every consumption point: a v1 hash must never
//! satisfy a v2 lookup.

use trellis_identity::hash_short;

pub const STUDY_KEY_HASH: &str = "trellis.study_key_hash";
pub const TRIAL_KEY_HASH: &str = "trellis.trial_key_hash";
pub const FAMILY_KEY_HASH: &str = "trellis.study_family_hash";
pub const KEY_SCHEMA: &str = "trellis.key_schema";
pub const RUN_NAME: &str = "trellis.run_name";
pub const TRIAL_ID: &str = "trellis.trial_id";
pub const INTERRUPTED: &str = "trellis.interrupted";
pub const PROCESS: &str = "trellis.process";
pub const ENVIRONMENT: &str = "trellis.environment";
pub const DATA_FINGERPRINT: &str = "trellis.data_fingerprint";
pub const MODEL: &str = "trellis.model";

/// Maximum tag value length accepted by MLflow-compatible backends.
pub const MAX_TAG_VALUE_LEN: usize = 250;

/// Sanitize a tag value for the tracking backend.
///
/// Trims, strips control characters, drops non-ASCII, and bounds the
/// length. A value that sanitizes to nothing (e.g. all-emoji) falls back to
/// its short hash so the tag is still set and still deterministic, instead
/// of being rejected by the backend.
#[must_use]
pub fn sanitize_tag_value(value: &str) -> String {
    let mut sanitized: String = value
        .trim()
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control())
        .collect();
    sanitized.truncate(MAX_TAG_VALUE_LEN);
    let sanitized = sanitized.trim().to_string();
    if sanitized.is_empty() && !value.is_empty() {
        return hash_short(value);
    }
    sanitized
}
