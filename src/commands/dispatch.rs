//! Command dispatch logic for coachbench

use std::time::Instant;

use clap::CommandFactory;
use coachbench_core::error::Result;

use crate::cli::{Cli, Commands};
use crate::commands;

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    let result = match &cli.command {
        None => handle_no_command(),
        Some(Commands::Run(args)) => commands::run::execute(cli, args),
        Some(Commands::Leaderboard {
            snapshot,
            allow_stale,
        }) => commands::leaderboard::execute(cli, snapshot, *allow_stale),
        Some(Commands::Scenarios { dir }) => commands::scenarios::list(cli, dir),
        Some(Commands::Show { id, dir }) => commands::scenarios::show(cli, dir, id),
    };
    tracing::debug!(elapsed = ?start.elapsed(), "command finished");
    result
}

fn handle_no_command() -> Result<()> {
    Cli::command().print_help()?;
    println!();
    Ok(())
}
