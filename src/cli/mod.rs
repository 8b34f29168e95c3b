//! CLI argument parsing for coachbench
//!
//! Global flags: --format, --quiet, --verbose, --log-level, --log-json, --config

pub mod args;
pub mod output;
pub mod parse;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use args::{Provider, RunArgs};
pub use output::OutputFormat;

/// Coachbench - evaluate coaching models against synthetic personas
#[derive(Parser, Debug)]
#[command(name = "coachbench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level or filter directive (e.g. `info`, `coachbench_core=trace`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file
    #[arg(long, global = true, env = "COACHBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an evaluation batch and print the leaderboard
    Run(RunArgs),

    /// Print the leaderboard stored in a snapshot
    Leaderboard {
        /// Snapshot file
        #[arg(long)]
        snapshot: PathBuf,

        /// Read the snapshot even when it is older than the staleness window
        #[arg(long)]
        allow_stale: bool,
    },

    /// List scenarios
    Scenarios {
        /// Scenario directory
        #[arg(long, default_value = "fixtures/scenarios")]
        dir: PathBuf,
    },

    /// Show one scenario
    Show {
        /// Scenario id
        id: String,

        /// Scenario directory
        #[arg(long, default_value = "fixtures/scenarios")]
        dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_requires_candidate() {
        let err = Cli::try_parse_from(["coachbench", "run", "--synthetic", "a", "--judge", "b"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_run_parses_repeated_candidates() {
        let cli = Cli::try_parse_from([
            "coachbench",
            "--format",
            "json",
            "run",
            "-c",
            "mock:a",
            "-c",
            "mock:b",
            "--synthetic",
            "mock:p",
            "--judge",
            "mock:j",
            "--provider",
            "mock",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.candidates.len(), 2);
        assert_eq!(args.provider, Provider::Mock);
    }
}
