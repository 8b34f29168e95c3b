//! Incremental batch snapshots for crash recovery
//!
//! A snapshot is overwritten after every run. It is written to a sibling
//! temp file and renamed into place, so a reader never sees a partial file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EvalError, Result};
use crate::leaderboard::LeaderboardEntry;
use crate::run::Run;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub runs: Vec<Run>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub timestamp: DateTime<Utc>,
    pub status: SnapshotStatus,
}

impl Snapshot {
    pub fn new(runs: Vec<Run>, leaderboard: Vec<LeaderboardEntry>, status: SnapshotStatus) -> Self {
        Self {
            runs,
            leaderboard,
            timestamp: Utc::now(),
            status,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    max_age: Duration,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, max_age_secs: u64) -> Self {
        let secs = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
        Self {
            path: path.into(),
            max_age: Duration::try_seconds(secs).unwrap_or(Duration::MAX),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the snapshot file
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| EvalError::io_operation("create", parent.display(), e))?;
        }

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        let file = File::create(&temp)
            .map_err(|e| EvalError::io_operation("create", temp.display(), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&temp, &self.path)
            .map_err(|e| EvalError::io_operation("write", self.path.display(), e))?;
        debug!(
            path = %self.path.display(),
            runs = snapshot.runs.len(),
            status = ?snapshot.status,
            "snapshot saved"
        );
        Ok(())
    }

    /// Read the snapshot regardless of age. `None` when no file exists.
    pub fn read(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| EvalError::io_operation("read", self.path.display(), e))?;
        let snapshot = serde_json::from_str(&content).map_err(|e| {
            EvalError::io_operation("parse snapshot", self.path.display(), e)
        })?;
        Ok(Some(snapshot))
    }

    /// Read the snapshot, treating one older than the staleness window as absent
    pub fn load(&self) -> Result<Option<Snapshot>> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Result<Option<Snapshot>> {
        let Some(snapshot) = self.read()? else {
            return Ok(None);
        };
        if snapshot.age(now) > self.max_age {
            info!(
                path = %self.path.display(),
                age_secs = snapshot.age(now).num_seconds(),
                "ignoring stale snapshot"
            );
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Runs to carry over when resuming: only from an unfinished, fresh snapshot
    pub fn resumable_runs(&self) -> Result<Vec<Run>> {
        Ok(match self.load()? {
            Some(snapshot) if snapshot.status == SnapshotStatus::InProgress => snapshot.runs,
            _ => Vec::new(),
        })
    }
}
