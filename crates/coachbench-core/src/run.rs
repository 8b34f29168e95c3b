//! One evaluation of a (candidate model, scenario) pair

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::judge::JudgeReport;
use crate::model::{ModelDescriptor, ModelRole};
use crate::profile::{BucketProfile, DiscoveryProfile};
use crate::scenario::Scenario;
use crate::simulator::SafeguardCounts;
use crate::transcript::Transcript;
use crate::usage::{EvalPhase, TokenUsage, UsageLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub candidate: ModelDescriptor,
    pub synthetic_user: ModelDescriptor,
    pub judge: ModelDescriptor,
    pub scenario_id: String,
    pub scenario_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Discovery and bucket-build messages
    #[serde(default)]
    pub transcript: Transcript,
    #[serde(default)]
    pub discovery_profile: DiscoveryProfile,
    #[serde(default)]
    pub bucket_profile: BucketProfile,
    #[serde(default)]
    pub decision_messages: Transcript,
    #[serde(default)]
    pub usage: UsageLedger,
    #[serde(default)]
    pub safeguards: SafeguardCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_report: Option<JudgeReport>,
    /// Set when the judge call itself failed; the run stays completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Run {
    pub fn new(
        candidate: &ModelDescriptor,
        synthetic_user: &ModelDescriptor,
        judge: &ModelDescriptor,
        scenario: &Scenario,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            candidate: candidate.clone(),
            synthetic_user: synthetic_user.clone(),
            judge: judge.clone(),
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            transcript: Transcript::new(),
            discovery_profile: DiscoveryProfile::default(),
            bucket_profile: BucketProfile::default(),
            decision_messages: Transcript::new(),
            usage: UsageLedger::new(),
            safeguards: SafeguardCounts::default(),
            judge_report: None,
            judge_error: None,
            error: None,
        }
    }

    /// Identifier used to group runs per model
    pub fn model_id(&self) -> &str {
        &self.candidate.id
    }

    pub fn covers(&self, model_id: &str, scenario_id: &str) -> bool {
        self.candidate.id == model_id && self.scenario_id == scenario_id
    }

    pub fn is_judged(&self) -> bool {
        self.judge_report.is_some()
    }

    /// Completed with something to judge
    pub fn is_judgeable(&self) -> bool {
        self.status == RunStatus::Completed && !self.transcript.is_empty()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.status.is_terminal() {
            crate::bail_invalid!(
                "run state",
                format!("run {} is already {}", self.id, self.status.as_str())
            );
        }
        Ok(())
    }

    pub fn record_usage(&mut self, phase: EvalPhase, role: ModelRole, usage: TokenUsage) -> Result<()> {
        if phase != EvalPhase::Judging {
            self.ensure_running()?;
        }
        self.usage.record(phase, role, usage);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.ensure_running()?;
        self.status = RunStatus::Failed;
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Attach the judge's verdict. Only completed, not yet judged runs accept one.
    pub fn record_judgement(&mut self, report: JudgeReport, usage: TokenUsage) -> Result<()> {
        if self.status != RunStatus::Completed || self.is_judged() {
            crate::bail_invalid!("run state", format!("run {} cannot be judged", self.id));
        }
        self.usage.record(EvalPhase::Judging, ModelRole::Judge, usage);
        self.judge_report = Some(report);
        self.judge_error = None;
        Ok(())
    }

    pub fn record_judge_error(&mut self, message: impl Into<String>) {
        self.judge_error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> Run {
        let scenario: Scenario =
            serde_yaml::from_str("id: s1\nname: Scenario one\npersona: P\n").unwrap();
        Run::new(
            &ModelDescriptor::new("mock", "coach"),
            &ModelDescriptor::new("mock", "persona"),
            &ModelDescriptor::new("mock", "judge"),
            &scenario,
        )
    }

    #[test]
    fn test_terminal_runs_are_immutable() {
        let mut run = run();
        run.fail("boom").unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.complete().is_err());
        assert!(run.fail("again").is_err());
        assert_eq!(run.error.as_deref(), Some("boom"));
        assert!(run
            .record_usage(EvalPhase::Discovery, ModelRole::Candidate, TokenUsage::new(1, 1))
            .is_err());
    }

    #[test]
    fn test_judgement_only_on_completed_runs() {
        let mut failed = run();
        failed.fail("x").unwrap();
        assert!(failed
            .record_judgement(JudgeReport::default(), TokenUsage::default())
            .is_err());

        let mut done = run();
        done.complete().unwrap();
        done.record_judgement(JudgeReport::default(), TokenUsage::new(100, 20))
            .unwrap();
        assert!(done.is_judged());
        assert_eq!(done.usage.role_total(ModelRole::Judge), TokenUsage::new(100, 20));
        assert!(done
            .record_judgement(JudgeReport::default(), TokenUsage::default())
            .is_err());
    }

    #[test]
    fn test_serialization_round_trip_keeps_identity() {
        let mut run = run();
        run.complete().unwrap();
        let json = serde_json::to_string(&run).unwrap();
        let back: Run = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, run.id);
        assert!(back.covers("coach", "s1"));
        assert_eq!(back.status, RunStatus::Completed);
    }
}
