//! Progress snapshots emitted while a batch runs

use serde::{Deserialize, Serialize};

use crate::usage::EvalPhase;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Aborted,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Idle => "idle",
            BatchStatus::Running => "running",
            BatchStatus::Paused => "paused",
            BatchStatus::Completed => "completed",
            BatchStatus::Aborted => "aborted",
            BatchStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub status: BatchStatus,
    pub total_runs: usize,
    pub completed_runs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<EvalPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_exchange: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_exchanges: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Position inside one run, reported by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseProgress {
    pub phase: EvalPhase,
    pub exchange: Option<u32>,
    pub total_exchanges: Option<u32>,
}

impl PhaseProgress {
    pub fn phase(phase: EvalPhase) -> Self {
        Self {
            phase,
            exchange: None,
            total_exchanges: None,
        }
    }

    pub fn exchange(phase: EvalPhase, exchange: u32, total: Option<u32>) -> Self {
        Self {
            phase,
            exchange: Some(exchange),
            total_exchanges: total,
        }
    }
}

impl Progress {
    pub fn apply(&mut self, update: PhaseProgress) {
        self.current_phase = Some(update.phase);
        self.current_exchange = update.exchange;
        self.total_exchanges = update.total_exchanges;
    }
}

/// Receives progress; called at least once per phase change and exchange
pub type ProgressFn<'a> = dyn FnMut(&Progress) + Send + 'a;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_phase_progress() {
        let mut progress = Progress {
            status: BatchStatus::Running,
            total_runs: 4,
            ..Default::default()
        };
        progress.apply(PhaseProgress::exchange(EvalPhase::Discovery, 5, Some(12)));
        assert_eq!(progress.current_exchange, Some(5));
        assert_eq!(progress.total_exchanges, Some(12));

        progress.apply(PhaseProgress::phase(EvalPhase::Judging));
        assert_eq!(progress.current_phase, Some(EvalPhase::Judging));
        assert_eq!(progress.current_exchange, None);

        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["status"], "running");
        assert!(json.get("error_message").is_none());
    }
}
