//! Trellis Identity
//!
//! Deterministic identity primitives for the training pipeline:
//! - Content hashing and canonical JSON (`hash`, `canonical`)
//! - Hyperparameter normalization for stable hashing (`hparams`)
//! - Data/evaluation content fingerprints (`fingerprint`)
//! - Study, study-family and trial key builders (`keys`)
//!
//! Everything in this crate is a pure function: same logical input, same
//! bytes out, across processes and platforms. Nothing here touches the
//! filesystem or the tracking server.

pub mod canonical;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod hparams;
pub mod keys;

pub use canonical::{canonical_json_bytes, canonical_json_string};
pub use error::{IdentityError, IdentityResult};
pub use fingerprint::{data_fingerprint, eval_fingerprint};
pub use hash::{hash_full, hash_json, hash_short, HashLength};
pub use hparams::normalize_hparams;
pub use keys::{
    build_study_family_key, build_study_key_v1, build_study_key_v2, build_trial_key, ConfigMap,
    KeyDigest, KeySchema, StudyKeyV1Inputs, StudyKeyV2Inputs,
};
