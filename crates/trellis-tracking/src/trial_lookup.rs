//! Run lookup by human trial identifier.
//!
//! A looser companion to the finder: resolves a run purely by its trial-id
//! tag, skipping runs marked interrupted and preferring the most recently
//! started match. Without an experiment name it scans every experiment in
//! listing order, stopping at the first hit — slower than a scoped search,
//! but tolerant of studies that moved between experiments.

use tracing::{debug, warn};

use crate::client::{Run, RunFilter, RunOrder, TrackingClient};
use crate::error::{TrackingError, TrackingResult};
use crate::tags;

const MAX_CANDIDATES: usize = 50;

pub fn find_run_by_trial_id(
    client: &dyn TrackingClient,
    trial_id: &str,
    experiment_name: Option<&str>,
) -> TrackingResult<Option<Run>> {
    let experiments = match experiment_name {
        Some(name) => {
            let experiment = client
                .list_experiments()?
                .into_iter()
                .find(|e| e.name == name)
                .ok_or_else(|| TrackingError::ExperimentNotFound(name.to_string()))?;
            vec![experiment]
        }
        None => {
            let all = client.list_experiments()?;
            warn!(
                trial_id,
                experiments = all.len(),
                "no experiment name given, scanning every experiment for the trial tag"
            );
            all
        }
    };

    let filter = RunFilter::default().tag(tags::TRIAL_ID, trial_id);
    for experiment in experiments {
        let candidates = match client.search_runs(
            &[experiment.experiment_id.clone()],
            &filter,
            MAX_CANDIDATES,
            RunOrder::StartTimeDesc,
        ) {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!(
                    experiment = %experiment.name,
                    error = %e,
                    "trial tag search failed, trying next experiment"
                );
                continue;
            }
        };
        let hit = candidates
            .into_iter()
            .find(|run| run.tag(tags::INTERRUPTED) != Some("true"));
        if let Some(run) = hit {
            return Ok(Some(run));
        }
    }
    Ok(None)
}
