use std::path::PathBuf;

use clap::{Args, ValueEnum};
use coachbench_core::model::ModelDescriptor;

use super::parse::parse_model;

/// Which gateway serves model calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// OpenAI-compatible chat completions endpoint
    #[default]
    Openai,
    /// Deterministic offline replies, no network
    Mock,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Candidate model under test (`provider:model`); repeat for several
    #[arg(long = "candidate", short = 'c', required = true, value_parser = parse_model)]
    pub candidates: Vec<ModelDescriptor>,

    /// Model playing the synthetic user
    #[arg(long, value_parser = parse_model, env = "COACHBENCH_SYNTHETIC_MODEL")]
    pub synthetic: ModelDescriptor,

    /// Model scoring the runs
    #[arg(long, value_parser = parse_model, env = "COACHBENCH_JUDGE_MODEL")]
    pub judge: ModelDescriptor,

    /// Scenario directory
    #[arg(long, default_value = "fixtures/scenarios")]
    pub scenarios: PathBuf,

    /// Scenarios per candidate (overrides the config)
    #[arg(long)]
    pub per_model: Option<usize>,

    /// Draw scenarios at random instead of taking the first N
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for --shuffle
    #[arg(long, requires = "shuffle")]
    pub seed: Option<u64>,

    /// Snapshot file kept current after every run
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Continue from an unfinished snapshot
    #[arg(long, requires = "snapshot")]
    pub resume: bool,

    /// Gateway serving the model calls
    #[arg(long, value_enum, default_value = "openai")]
    pub provider: Provider,

    /// Gateway base URL (overrides the config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Do not read pause/resume/abort commands from stdin
    #[arg(long)]
    pub no_stdin_control: bool,
}
