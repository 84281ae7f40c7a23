//! Key and fingerprint computation commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use trellis_identity::{
    build_study_family_key, build_study_key_v1, build_study_key_v2, build_trial_key,
    data_fingerprint, eval_fingerprint, KeyDigest, StudyKeyV1Inputs, StudyKeyV2Inputs,
};

use super::{config_section, load_config_map};

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Compute a v2 study key from a pipeline config file
    Study {
        /// Pipeline config (YAML with data/hpo/training/evaluation sections)
        #[arg(short, long)]
        config: PathBuf,
        /// Model backbone identifier
        #[arg(short, long)]
        model: String,
        /// Compute the legacy v1 key instead
        #[arg(long)]
        v1: bool,
        /// Print the canonical key document as well
        #[arg(long)]
        show_document: bool,
    },
    /// Compute a study-family key (v2 without the model binding)
    Family {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        show_document: bool,
    },
    /// Compute a trial key from a study key hash and a hyperparameter file
    Trial {
        /// Full study key hash (64 hex characters)
        #[arg(long)]
        study_hash: String,
        /// Hyperparameters (YAML mapping)
        #[arg(short, long)]
        params: PathBuf,
    },
    /// Compute a data or evaluation content fingerprint
    Fingerprint {
        /// Config file (YAML mapping)
        #[arg(short, long)]
        config: PathBuf,
        /// Fingerprint kind: data or eval
        #[arg(short, long, default_value = "data")]
        kind: String,
    },
}

pub fn execute(cmd: KeyCommand) -> Result<()> {
    match cmd {
        KeyCommand::Study { config, model, v1, show_document } => {
            let pipeline = load_config_map(&config)?;
            let digest = if v1 {
                study_key_v1(&pipeline, &model)?
            } else {
                study_key_v2(&pipeline, &model)?
            };
            print_digest(&digest, show_document);
            Ok(())
        }
        KeyCommand::Family { config, show_document } => {
            let pipeline = load_config_map(&config)?;
            let digest = family_key(&pipeline)?;
            print_digest(&digest, show_document);
            Ok(())
        }
        KeyCommand::Trial { study_hash, params } => {
            let hparams = load_config_map(&params)?;
            let digest =
                build_trial_key(&study_hash, &hparams).context("failed to build trial key")?;
            print_digest(&digest, false);
            Ok(())
        }
        KeyCommand::Fingerprint { config, kind } => {
            let map = load_config_map(&config)?;
            let fingerprint = match kind.as_str() {
                "data" => data_fingerprint(&map),
                "eval" => eval_fingerprint(&map),
                other => anyhow::bail!("unknown fingerprint kind '{other}' (expected data or eval)"),
            };
            println!("{fingerprint}");
            Ok(())
        }
    }
}

fn study_key_v1(pipeline: &serde_json::Map<String, serde_json::Value>, model: &str) -> Result<KeyDigest> {
    let dataset = config_section(pipeline, "data");
    let hpo = config_section(pipeline, "hpo");
    let search_space = config_section(&hpo, "search_space");
    let objective = config_section(&hpo, "objective");
    let benchmark = pipeline
        .get("benchmark")
        .and_then(serde_json::Value::as_object)
        .cloned();
    build_study_key_v1(&StudyKeyV1Inputs {
        dataset: &dataset,
        search_space: &search_space,
        objective: &objective,
        model,
        benchmark: benchmark.as_ref(),
    })
    .context("failed to build v1 study key")
}

fn study_key_v2(pipeline: &serde_json::Map<String, serde_json::Value>, model: &str) -> Result<KeyDigest> {
    let (inputs, data_fp, eval_fp) = v2_sections(pipeline)?;
    build_study_key_v2(&StudyKeyV2Inputs {
        search_space: &inputs.search_space,
        objective: &inputs.objective,
        training_budget: &inputs.training_budget,
        seed_policy: &inputs.seed_policy,
        model,
        data_fingerprint: &data_fp,
        eval_fingerprint: &eval_fp,
    })
    .context("failed to build v2 study key")
}

fn family_key(pipeline: &serde_json::Map<String, serde_json::Value>) -> Result<KeyDigest> {
    let (inputs, data_fp, eval_fp) = v2_sections(pipeline)?;
    build_study_family_key(&StudyKeyV2Inputs {
        search_space: &inputs.search_space,
        objective: &inputs.objective,
        training_budget: &inputs.training_budget,
        seed_policy: &inputs.seed_policy,
        model: "",
        data_fingerprint: &data_fp,
        eval_fingerprint: &eval_fp,
    })
    .context("failed to build study-family key")
}

struct V2Sections {
    search_space: serde_json::Map<String, serde_json::Value>,
    objective: serde_json::Map<String, serde_json::Value>,
    training_budget: serde_json::Map<String, serde_json::Value>,
    seed_policy: serde_json::Map<String, serde_json::Value>,
}

fn v2_sections(
    pipeline: &serde_json::Map<String, serde_json::Value>,
) -> Result<(V2Sections, String, String)> {
    let data = config_section(pipeline, "data");
    let evaluation = config_section(pipeline, "evaluation");
    let hpo = config_section(pipeline, "hpo");
    let training = config_section(pipeline, "training");

    // fingerprints are computed here, once, and passed in explicitly
    let data_fp = data_fingerprint(&data);
    let eval_fp = eval_fingerprint(&evaluation);

    Ok((
        V2Sections {
            search_space: config_section(&hpo, "search_space"),
            objective: config_section(&hpo, "objective"),
            training_budget: config_section(&training, "budget"),
            seed_policy: config_section(&hpo, "seed_policy"),
        },
        data_fp,
        eval_fp,
    ))
}

fn print_digest(digest: &KeyDigest, show_document: bool) {
    println!("{}  {}", digest.hash.bold(), digest.schema.label().dimmed());
    if show_document {
        println!("{}", digest.canonical_json);
    }
}
