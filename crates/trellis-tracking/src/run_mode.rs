//! Run-mode / idempotency policy.
//!
//! Every pipeline stage asks the same two questions — "does a run for this
//! identity already exist?" and "did it finish?" — and feeds the answers
//! through one decision function so reuse semantics cannot drift between
//! stages. The asymmetry lives in the process type: an HPO study is
//! reusable the moment its storage exists (trials can always be appended),
//! while a final-training run is only reusable if it actually finished — a
//! half-written checkpoint must never be treated as the final artifact.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    ForceNew,
    #[default]
    ReuseIfExists,
    ResumeIfIncomplete,
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "force_new" => Ok(RunMode::ForceNew),
            "reuse_if_exists" => Ok(RunMode::ReuseIfExists),
            "resume_if_incomplete" => Ok(RunMode::ResumeIfIncomplete),
            other => Err(format!("unknown run mode '{other}'")),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunMode::ForceNew => "force_new",
            RunMode::ReuseIfExists => "reuse_if_exists",
            RunMode::ResumeIfIncomplete => "resume_if_incomplete",
        };
        f.write_str(s)
    }
}

/// The pipeline stages that create tracked runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    HpoSweep,
    Trial,
    Refit,
    Selection,
    FinalTraining,
    Conversion,
    Benchmark,
}

impl ProcessKind {
    /// Short slug used in run names and counter keys.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            ProcessKind::HpoSweep => "hpo",
            ProcessKind::Trial => "trial",
            ProcessKind::Refit => "refit",
            ProcessKind::Selection => "select",
            ProcessKind::FinalTraining => "final",
            ProcessKind::Conversion => "convert",
            ProcessKind::Benchmark => "bench",
        }
    }

    /// Whether reuse of an existing run requires it to have finished.
    ///
    /// Stages whose output is a single final checkpoint care; stages whose
    /// state is appendable or recomputable do not.
    #[must_use]
    pub fn completeness_matters(self) -> bool {
        matches!(
            self,
            ProcessKind::Trial
                | ProcessKind::Refit
                | ProcessKind::FinalTraining
                | ProcessKind::Conversion
        )
    }

    /// Whether run names for this stage carry an auto-increment suffix.
    /// Trials are already disambiguated by their trial key hash.
    #[must_use]
    pub fn versioned_naming(self) -> bool {
        !matches!(self, ProcessKind::Trial)
    }
}

impl std::str::FromStr for ProcessKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "hpo" | "hpo_sweep" => Ok(ProcessKind::HpoSweep),
            "trial" => Ok(ProcessKind::Trial),
            "refit" => Ok(ProcessKind::Refit),
            "select" | "selection" => Ok(ProcessKind::Selection),
            "final" | "final_training" => Ok(ProcessKind::FinalTraining),
            "convert" | "conversion" => Ok(ProcessKind::Conversion),
            "bench" | "benchmark" | "benchmarking" => Ok(ProcessKind::Benchmark),
            other => Err(format!("unknown process kind '{other}'")),
        }
    }
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Decide whether an existing run satisfies this execution.
#[must_use]
pub fn should_reuse(mode: RunMode, exists: bool, is_complete: bool, process: ProcessKind) -> bool {
    match mode {
        RunMode::ForceNew => false,
        RunMode::ReuseIfExists => {
            exists && (!process.completeness_matters() || is_complete)
        }
        RunMode::ResumeIfIncomplete => exists && !is_complete,
    }
}

/// Drive library-level "load existing state" flags (e.g. resume-from-
/// checkpoint) from the run mode.
#[must_use]
pub fn load_if_exists(mode: RunMode, checkpoint_enabled: bool) -> bool {
    match mode {
        RunMode::ForceNew => false,
        RunMode::ReuseIfExists | RunMode::ResumeIfIncomplete => checkpoint_enabled,
    }
}
