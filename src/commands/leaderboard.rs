//! `coachbench leaderboard` - print the leaderboard stored in a snapshot

use std::path::Path;

use coachbench_core::config::EvalConfig;
use coachbench_core::error::{EvalError, Result};
use coachbench_core::snapshot::SnapshotStore;

use crate::cli::Cli;
use crate::commands::render;

pub fn execute(cli: &Cli, path: &Path, allow_stale: bool) -> Result<()> {
    let config = EvalConfig::resolve(cli.config.as_deref())?;
    let store = SnapshotStore::new(path, config.snapshot_max_age_secs);
    let snapshot = if allow_stale {
        store.read()?
    } else {
        store.load()?
    }
    .ok_or_else(|| EvalError::SnapshotUnavailable {
        path: path.to_path_buf(),
    })?;

    render::print_leaderboard(cli, &snapshot.leaderboard)
}
