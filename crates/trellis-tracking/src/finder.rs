//! Priority-ordered run discovery.
//!
//! Signals for "this run already exists" come in decreasing reliability:
//!
//! 1. a run id the caller already holds
//! 2. a `run_metadata.json` sidecar written next to a previous run's output
//! 3. the local run index (cache, cross-checked against the endpoint)
//! 4. a tag search by identity hash — the backend-authoritative answer
//! 5. a tag search by loose context (process/model/environment)
//! 6. a tag search by human-readable run name
//! 7. the most recent run in the experiment
//!
//! Tiers are attempted once each, in order, short-circuiting on the first
//! hit. Tiers 5–7 can return a semantically unrelated run; they only exist
//! for best-effort tagging and reporting, are logged at warning level, and
//! are never consulted in strict mode — a strict caller that misses tiers
//! 1–4 gets an error, not a guess.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{Run, RunFilter, RunOrder, TrackingClient};
use crate::error::{TrackingError, TrackingResult};
use crate::tags;
use trellis_identity::{KeyDigest, KeySchema};
use trellis_store::RunIndex;

pub const RUN_METADATA_FILENAME: &str = "run_metadata.json";

/// Which discovery signal produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryTier {
    DirectId,
    MetadataFile,
    LocalIndex,
    IdentityTag,
    ContextTags,
    NameTag,
    MostRecent,
}

impl DiscoveryTier {
    #[must_use]
    pub fn is_weak(self) -> bool {
        matches!(
            self,
            DiscoveryTier::ContextTags | DiscoveryTier::NameTag | DiscoveryTier::MostRecent
        )
    }
}

impl std::fmt::Display for DiscoveryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiscoveryTier::DirectId => "direct_id",
            DiscoveryTier::MetadataFile => "metadata_file",
            DiscoveryTier::LocalIndex => "local_index",
            DiscoveryTier::IdentityTag => "identity_tag",
            DiscoveryTier::ContextTags => "context_tags",
            DiscoveryTier::NameTag => "name_tag",
            DiscoveryTier::MostRecent => "most_recent",
        };
        f.write_str(s)
    }
}

/// A successful discovery: the run plus the tier that produced it.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub run: Run,
    pub tier: DiscoveryTier,
}

/// Outcome of a non-strict find. A miss is not an error; it reports what
/// was tried so callers (and log readers) never see a bare "not found".
#[derive(Debug, Clone)]
pub enum FindOutcome {
    Found(Discovery),
    NotFound { attempted: Vec<DiscoveryTier> },
}

impl FindOutcome {
    #[must_use]
    pub fn found(&self) -> Option<&Discovery> {
        match self {
            FindOutcome::Found(discovery) => Some(discovery),
            FindOutcome::NotFound { .. } => None,
        }
    }
}

/// Inputs for one discovery attempt. Absent fields simply skip their tier.
#[derive(Debug, Clone, Default)]
pub struct FindRequest {
    /// Tier 1: a run id the caller already holds.
    pub run_id: Option<String>,
    /// Tier 2: path of a run-metadata sidecar file.
    pub metadata_path: Option<PathBuf>,
    /// Tiers 3–4: the identity hash to resolve.
    pub key_hash: Option<String>,
    /// Schema of `key_hash`; consumption-side guard against schema mixing.
    pub key_schema: Option<KeySchema>,
    /// Experiments to search in tiers 4–7; empty means all.
    pub experiment_ids: Vec<String>,
    /// When set, any candidate from any tier must belong to this experiment.
    pub expected_experiment_id: Option<String>,
    /// Tier 6: the human-readable run name.
    pub run_name: Option<String>,
    /// Tier 5: loose context tags (process, model, environment).
    pub context_tags: Vec<(String, String)>,
    /// Strict callers need idempotent-resume semantics: exhausting tiers
    /// 1–4 raises instead of falling through to guesses.
    pub strict: bool,
}

impl FindRequest {
    /// Request resolving a computed key in strict mode.
    #[must_use]
    pub fn strict_for_key(key: &KeyDigest) -> Self {
        Self {
            key_hash: Some(key.hash.clone()),
            key_schema: Some(key.schema),
            strict: true,
            ..Self::default()
        }
    }
}

/// The finder; holds the client and, optionally, the local index.
pub struct RunFinder<'a> {
    client: &'a dyn TrackingClient,
    index: Option<&'a RunIndex>,
}

impl<'a> RunFinder<'a> {
    #[must_use]
    pub fn new(client: &'a dyn TrackingClient) -> Self {
        Self { client, index: None }
    }

    #[must_use]
    pub fn with_index(mut self, index: &'a RunIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn find(&self, request: &FindRequest) -> TrackingResult<FindOutcome> {
        let mut attempted = Vec::new();

        let trusted: [(DiscoveryTier, fn(&Self, &FindRequest) -> Option<Run>); 4] = [
            (DiscoveryTier::DirectId, Self::try_direct_id),
            (DiscoveryTier::MetadataFile, Self::try_metadata_file),
            (DiscoveryTier::LocalIndex, Self::try_local_index),
            (DiscoveryTier::IdentityTag, Self::try_identity_tag),
        ];
        for (tier, attempt) in trusted {
            attempted.push(tier);
            if let Some(run) = attempt(self, request) {
                debug!(run_id = %run.run_id, %tier, "resolved existing run");
                return Ok(FindOutcome::Found(Discovery { run, tier }));
            }
        }

        if request.strict {
            return Err(TrackingError::DiscoveryExhausted {
                identity: request.key_hash.clone().unwrap_or_else(|| "<none>".to_string()),
                attempted,
            });
        }

        let weak: [(DiscoveryTier, fn(&Self, &FindRequest) -> Option<Run>); 3] = [
            (DiscoveryTier::ContextTags, Self::try_context_tags),
            (DiscoveryTier::NameTag, Self::try_name_tag),
            (DiscoveryTier::MostRecent, Self::try_most_recent),
        ];
        for (tier, attempt) in weak {
            attempted.push(tier);
            if let Some(run) = attempt(self, request) {
                warn!(
                    run_id = %run.run_id,
                    %tier,
                    "resolved run through a weak fallback; the match may be unrelated"
                );
                return Ok(FindOutcome::Found(Discovery { run, tier }));
            }
        }

        Ok(FindOutcome::NotFound { attempted })
    }

    fn try_direct_id(&self, request: &FindRequest) -> Option<Run> {
        let run_id = request.run_id.as_deref()?;
        match self.client.get_run(run_id) {
            Ok(run) if self.belongs(&run, request) => Some(run),
            Ok(run) => {
                debug!(
                    run_id,
                    experiment_id = %run.experiment_id,
                    "known run id belongs to a different experiment, skipping"
                );
                None
            }
            Err(e) => {
                debug!(run_id, error = %e, "direct run id lookup failed");
                None
            }
        }
    }

    fn try_metadata_file(&self, request: &FindRequest) -> Option<Run> {
        let path = request.metadata_path.as_deref()?;
        let metadata = match read_run_metadata(path) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "run metadata sidecar unreadable");
                return None;
            }
        };
        if metadata.tracking_uri != self.client.tracking_uri() {
            debug!(
                path = %path.display(),
                recorded = %metadata.tracking_uri,
                "sidecar was written against a different tracking endpoint, skipping"
            );
            return None;
        }
        match self.client.get_run(&metadata.run_id) {
            Ok(run) if self.belongs(&run, request) => Some(run),
            Ok(_) | Err(_) => {
                debug!(run_id = %metadata.run_id, "sidecar run id did not verify");
                None
            }
        }
    }

    fn try_local_index(&self, request: &FindRequest) -> Option<Run> {
        let key_hash = request.key_hash.as_deref()?;
        let index = self.index?;
        let entry = match index.get(key_hash, Some(self.client.tracking_uri())) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                debug!(key_hash, error = %e, "local index lookup failed");
                return None;
            }
        };
        match self.client.get_run(&entry.run_id) {
            Ok(run) if self.belongs(&run, request) => Some(run),
            Ok(_) | Err(_) => {
                debug!(
                    key_hash,
                    run_id = %entry.run_id,
                    "stale local index entry, falling through to tag search"
                );
                None
            }
        }
    }

    fn try_identity_tag(&self, request: &FindRequest) -> Option<Run> {
        let key_hash = request.key_hash.as_deref()?;
        let mut filter = RunFilter::default().tag(schema_hash_tag(request.key_schema), key_hash);
        if let Some(schema) = request.key_schema {
            filter = filter.tag(tags::KEY_SCHEMA, schema.label());
        }
        let candidates = match self.client.search_runs(
            &request.experiment_ids,
            &filter,
            2,
            RunOrder::StartTimeDesc,
        ) {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!(key_hash, error = %e, "identity tag search failed");
                return None;
            }
        };
        if candidates.len() > 1 {
            warn!(key_hash, "multiple runs share an identity tag; taking the most recent");
        }
        candidates.into_iter().find(|run| self.belongs(run, request))
    }

    fn try_context_tags(&self, request: &FindRequest) -> Option<Run> {
        if request.context_tags.is_empty() {
            return None;
        }
        let mut filter = RunFilter::default();
        for (key, value) in &request.context_tags {
            filter = filter.tag(key, value);
        }
        self.search_first(request, &filter)
    }

    fn try_name_tag(&self, request: &FindRequest) -> Option<Run> {
        let run_name = request.run_name.as_deref()?;
        let filter = RunFilter::default().tag(tags::RUN_NAME, run_name);
        self.search_first(request, &filter)
    }

    fn try_most_recent(&self, request: &FindRequest) -> Option<Run> {
        if request.experiment_ids.is_empty() {
            return None;
        }
        self.search_first(request, &RunFilter::default())
    }

    fn search_first(&self, request: &FindRequest, filter: &RunFilter) -> Option<Run> {
        match self
            .client
            .search_runs(&request.experiment_ids, filter, 1, RunOrder::StartTimeDesc)
        {
            Ok(candidates) => candidates.into_iter().find(|run| self.belongs(run, request)),
            Err(e) => {
                debug!(error = %e, "fallback search failed");
                None
            }
        }
    }

    fn belongs(&self, run: &Run, request: &FindRequest) -> bool {
        match request.expected_experiment_id.as_deref() {
            Some(expected) => run.experiment_id == expected,
            None => true,
        }
    }
}

fn schema_hash_tag(schema: Option<KeySchema>) -> &'static str {
    match schema {
        Some(KeySchema::Trial) => tags::TRIAL_KEY_HASH,
        Some(KeySchema::StudyFamilyV2) => tags::FAMILY_KEY_HASH,
        _ => tags::STUDY_KEY_HASH,
    }
}

/// The sidecar record co-located with a run's output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadataFile {
    pub run_id: String,
    pub experiment_id: String,
    pub tracking_uri: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Write the sidecar next to a run's output so later stages can resume via
/// tier 2 without a remote query.
pub fn write_run_metadata(dir: &Path, run: &Run, tracking_uri: &str) -> TrackingResult<PathBuf> {
    let path = dir.join(RUN_METADATA_FILENAME);
    let record = RunMetadataFile {
        run_id: run.run_id.clone(),
        experiment_id: run.experiment_id.clone(),
        tracking_uri: tracking_uri.to_string(),
        extra: BTreeMap::new(),
    };
    trellis_store::atomic_write_json(&path, &record)?;
    Ok(path)
}

/// Read a sidecar; a missing file is `None`, a corrupt one is an error the
/// finder downgrades to a tier miss.
pub fn read_run_metadata(path: &Path) -> TrackingResult<Option<RunMetadataFile>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}
