//! Human-readable run names and tag dictionaries.
//!
//! Names are deterministic over a typed naming context plus, for versioned
//! process types, the auto-increment suffix reserved through the counter
//! store. Every template embeds an 8-character identity-hash prefix: short
//! enough to read, long enough that two different logical entities cannot
//! share a visible name at any practical collision rate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::run_mode::ProcessKind;
use crate::tags;
use trellis_identity::KeyDigest;

/// Where the pipeline is executing. Threaded explicitly through naming and
/// acquisition; never detected from ambient global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionEnvironment {
    Local,
    HostedNotebook,
    CloudWorkspace,
}

impl ExecutionEnvironment {
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ExecutionEnvironment::Local => "local",
            ExecutionEnvironment::HostedNotebook => "notebook",
            ExecutionEnvironment::CloudWorkspace => "cloud",
        }
    }
}

impl std::str::FromStr for ExecutionEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(ExecutionEnvironment::Local),
            "notebook" | "hosted_notebook" => Ok(ExecutionEnvironment::HostedNotebook),
            "cloud" | "cloud_workspace" => Ok(ExecutionEnvironment::CloudWorkspace),
            other => Err(format!("unknown execution environment '{other}'")),
        }
    }
}

impl std::fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Everything a name or counter key is derived from.
#[derive(Debug, Clone)]
pub struct NamingContext<'a> {
    pub project: &'a str,
    pub process: ProcessKind,
    pub model: &'a str,
    pub environment: ExecutionEnvironment,
    pub study_key_hash: &'a str,
    pub trial_key_hash: Option<&'a str>,
    pub trial_index: Option<u32>,
    pub fold: Option<u32>,
}

impl NamingContext<'_> {
    fn study_prefix(&self) -> &str {
        hash_prefix(self.study_key_hash)
    }

    fn model_slug(&self) -> String {
        self.model
            .trim()
            .to_lowercase()
            .replace(['/', ' '], "-")
    }
}

fn hash_prefix(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

/// Counter key scoping the auto-increment suffix: one sequence per
/// project × process × study × environment.
#[must_use]
pub fn counter_key(ctx: &NamingContext<'_>) -> String {
    format!(
        "{}:{}:{}:{}",
        ctx.project,
        ctx.process.slug(),
        ctx.study_prefix(),
        ctx.environment.slug()
    )
}

/// Build the run name for a context, with the reserved version suffix for
/// versioned process types.
#[must_use]
pub fn build_run_name(ctx: &NamingContext<'_>, version: Option<u64>) -> String {
    let mut name = match ctx.process {
        ProcessKind::Trial => {
            let trial_part = ctx
                .trial_key_hash
                .map(hash_prefix)
                .unwrap_or("unkeyed")
                .to_string();
            match ctx.trial_index {
                Some(index) => format!(
                    "{}-trial-{}-{}-t{:03}-{}",
                    ctx.project,
                    ctx.model_slug(),
                    ctx.study_prefix(),
                    index,
                    trial_part
                ),
                None => format!(
                    "{}-trial-{}-{}-{}",
                    ctx.project,
                    ctx.model_slug(),
                    ctx.study_prefix(),
                    trial_part
                ),
            }
        }
        ProcessKind::Selection => {
            format!("{}-select-{}", ctx.project, ctx.study_prefix())
        }
        process => {
            let mut base = format!(
                "{}-{}-{}-{}",
                ctx.project,
                process.slug(),
                ctx.model_slug(),
                ctx.study_prefix()
            );
            if let Some(fold) = ctx.fold {
                base.push_str(&format!("-f{fold}"));
            }
            base
        }
    };

    if ctx.process.versioned_naming() {
        if let Some(version) = version {
            name.push_str(&format!("-v{version}"));
        }
    }
    tags::sanitize_tag_value(&name)
}

/// The tag dictionary written at run creation.
///
/// Includes the identity hash under the schema-appropriate tag key, the
/// schema label itself, and the context tags the weak discovery fallbacks
/// search by.
#[must_use]
pub fn run_tags(
    ctx: &NamingContext<'_>,
    key: &KeyDigest,
    run_name: &str,
    data_fingerprint: Option<&str>,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let hash_tag = match key.schema {
        trellis_identity::KeySchema::Trial => tags::TRIAL_KEY_HASH,
        trellis_identity::KeySchema::StudyFamilyV2 => tags::FAMILY_KEY_HASH,
        _ => tags::STUDY_KEY_HASH,
    };
    out.insert(hash_tag.to_string(), key.hash.clone());
    out.insert(tags::KEY_SCHEMA.to_string(), key.schema.label().to_string());
    out.insert(tags::RUN_NAME.to_string(), tags::sanitize_tag_value(run_name));
    out.insert(tags::PROCESS.to_string(), ctx.process.slug().to_string());
    out.insert(tags::ENVIRONMENT.to_string(), ctx.environment.slug().to_string());
    out.insert(tags::MODEL.to_string(), tags::sanitize_tag_value(ctx.model));
    if let Some(fingerprint) = data_fingerprint {
        out.insert(
            tags::DATA_FINGERPRINT.to_string(),
            tags::sanitize_tag_value(fingerprint),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_identity::hash_full;

    fn ctx<'a>(process: ProcessKind, study_hash: &'a str) -> NamingContext<'a> {
        NamingContext {
            project: "resume-ner",
            process,
            model: "distilbert",
            environment: ExecutionEnvironment::Local,
            study_key_hash: study_hash,
            trial_key_hash: None,
            trial_index: None,
            fold: None,
        }
    }

    #[test]
    fn test_counter_key_shape() {
        let hash = hash_full("study");
        let key = counter_key(&ctx(ProcessKind::HpoSweep, &hash));
        assert_eq!(key, format!("resume-ner:hpo:{}:local", &hash[..8]));
    }

    #[test]
    fn test_versioned_name_carries_suffix() {
        let hash = hash_full("study");
        let name = build_run_name(&ctx(ProcessKind::FinalTraining, &hash), Some(3));
        assert!(name.starts_with("resume-ner-final-distilbert-"));
        assert!(name.ends_with("-v3"));
        assert!(name.contains(&hash[..8]));
    }

    #[test]
    fn test_trial_name_uses_trial_hash_not_version() {
        let study = hash_full("study");
        let trial = hash_full("trial");
        let mut context = ctx(ProcessKind::Trial, &study);
        context.trial_key_hash = Some(&trial);
        context.trial_index = Some(7);

        let name = build_run_name(&context, Some(9));
        assert!(name.contains("-t007-"));
        assert!(name.contains(&trial[..8]));
        assert!(!name.ends_with("-v9"));
    }

    #[test]
    fn test_model_slug_is_sanitized() {
        let hash = hash_full("study");
        let mut context = ctx(ProcessKind::HpoSweep, &hash);
        context.model = "Davlan/distilbert-base-multilingual";
        let name = build_run_name(&context, None);
        assert!(!name.contains('/'));
        assert!(name.contains("davlan-distilbert-base-multilingual"));
    }

    #[test]
    fn test_different_studies_never_share_a_name() {
        let a = hash_full("study-a");
        let b = hash_full("study-b");
        assert_ne!(
            build_run_name(&ctx(ProcessKind::HpoSweep, &a), Some(1)),
            build_run_name(&ctx(ProcessKind::HpoSweep, &b), Some(1)),
        );
    }

    #[test]
    fn test_run_tags_pick_schema_tag_key() {
        use serde_json::json;
        let hparams = json!({"lr": 0.001}).as_object().cloned().unwrap();
        let study_hash = hash_full("study");
        let trial_key = trellis_identity::build_trial_key(&study_hash, &hparams).unwrap();

        let context = ctx(ProcessKind::Trial, &study_hash);
        let tags_map = run_tags(&context, &trial_key, "name", None);
        assert_eq!(tags_map[tags::TRIAL_KEY_HASH], trial_key.hash);
        assert_eq!(tags_map[tags::KEY_SCHEMA], "trial-v1");
        assert!(!tags_map.contains_key(tags::STUDY_KEY_HASH));
    }
}
