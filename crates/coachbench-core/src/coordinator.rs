//! Run coordinator
//!
//! Sequences every (candidate, scenario) unit of a batch, judges completed
//! runs, keeps the snapshot current after each run and reports progress.
//! Units run strictly one after another.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::config::EvalConfig;
use crate::control::BatchControl;
use crate::error::{EvalError, Result};
use crate::gateway::{CallParams, GatewayError, ModelGateway};
use crate::judge::JudgeEngine;
use crate::leaderboard::{self, LeaderboardEntry};
use crate::model::{ModelDescriptor, ModelRole};
use crate::orchestrator::{run_evaluation, RunContext};
use crate::progress::{BatchStatus, PhaseProgress, Progress, ProgressFn};
use crate::run::{Run, RunStatus};
use crate::scenario::Scenario;
use crate::snapshot::{Snapshot, SnapshotStatus, SnapshotStore};
use crate::usage::EvalPhase;

/// Models and scenarios of one batch
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub candidates: Vec<ModelDescriptor>,
    pub synthetic_user: ModelDescriptor,
    pub judge: ModelDescriptor,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub runs: Vec<Run>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub status: BatchStatus,
    /// First run's error when every run failed
    pub error: Option<String>,
}

impl BatchOutcome {
    /// Top-level failure for a batch in which no run succeeded
    pub fn failure(&self) -> Option<EvalError> {
        (self.status == BatchStatus::Failed)
            .then(|| EvalError::BatchFailed(self.error.clone().unwrap_or_default()))
    }

    pub fn failed_runs(&self) -> impl Iterator<Item = &Run> {
        self.runs.iter().filter(|r| r.status == RunStatus::Failed)
    }
}

pub struct Coordinator<'a> {
    gateway: &'a dyn ModelGateway,
    config: &'a EvalConfig,
    control: BatchControl,
    snapshots: Option<SnapshotStore>,
}

impl<'a> Coordinator<'a> {
    pub fn new(gateway: &'a dyn ModelGateway, config: &'a EvalConfig) -> Self {
        Self {
            gateway,
            config,
            control: BatchControl::new(),
            snapshots: None,
        }
    }

    pub fn with_control(mut self, control: BatchControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_snapshots(mut self, store: SnapshotStore) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn control(&self) -> &BatchControl {
        &self.control
    }

    /// Check credentials for every role before any call is made
    pub fn preflight(&self, plan: &BatchPlan) -> Result<()> {
        if plan.candidates.is_empty() {
            return Err(EvalError::UsageError("no candidate models given".into()));
        }
        if plan.scenarios.is_empty() {
            return Err(EvalError::UsageError("no scenarios available".into()));
        }
        let roles = plan
            .candidates
            .iter()
            .map(|m| (ModelRole::Candidate, m))
            .chain([
                (ModelRole::SyntheticUser, &plan.synthetic_user),
                (ModelRole::Judge, &plan.judge),
            ]);
        for (role, model) in roles {
            self.gateway.ensure_ready(role, model).map_err(|err| match err {
                GatewayError::MissingCredential { role } => EvalError::MissingCredential {
                    role,
                    model: model.to_string(),
                },
                other => EvalError::Gateway(other),
            })?;
        }
        Ok(())
    }

    /// Scenarios for the candidate at `index`: the first N, or N drawn at
    /// random when shuffling is on
    pub fn select_scenarios<'s>(&self, scenarios: &'s [Scenario], index: usize) -> Vec<&'s Scenario> {
        let n = self.config.scenarios_per_model.min(scenarios.len());
        if !self.config.shuffle_scenarios {
            return scenarios.iter().take(n).collect();
        }
        let mut rng = match self.config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };
        scenarios.choose_multiple(&mut rng, n).collect()
    }

    fn save_snapshot(&self, runs: &[Run], board: &[LeaderboardEntry], status: SnapshotStatus) {
        let Some(store) = &self.snapshots else {
            return;
        };
        let snapshot = Snapshot::new(runs.to_vec(), board.to_vec(), status);
        if let Err(err) = store.save(&snapshot) {
            warn!(path = %store.path().display(), error = %err, "failed to save snapshot");
        }
    }

    /// Run the whole batch.
    ///
    /// `prior_runs` come from a resumed snapshot; pairs they already cover
    /// are skipped. Only configuration problems are errors here; failed runs
    /// are reported in the outcome.
    pub async fn run_batch(
        &self,
        plan: &BatchPlan,
        prior_runs: Vec<Run>,
        on_progress: &mut ProgressFn<'_>,
    ) -> Result<BatchOutcome> {
        self.preflight(plan)?;

        let judge_params = CallParams {
            temperature: self.config.judge_temperature,
            max_tokens: self.config.max_tokens.judge,
        };
        let judge = JudgeEngine::new(self.gateway, &plan.judge, judge_params)?;

        let units: Vec<(&ModelDescriptor, &Scenario)> = plan
            .candidates
            .iter()
            .enumerate()
            .flat_map(|(i, candidate)| {
                self.select_scenarios(&plan.scenarios, i)
                    .into_iter()
                    .map(move |scenario| (candidate, scenario))
            })
            .collect();

        let mut runs = prior_runs;
        let mut progress = Progress {
            status: BatchStatus::Running,
            total_runs: units.len(),
            completed_runs: units
                .iter()
                .filter(|(c, s)| runs.iter().any(|r| r.covers(&c.id, &s.id)))
                .count(),
            ..Progress::default()
        };
        info!(
            runs = progress.total_runs,
            resumed = progress.completed_runs,
            "batch started"
        );
        on_progress(&progress);

        let mut aborted = false;
        for (candidate, scenario) in units {
            if runs.iter().any(|r| r.covers(&candidate.id, &scenario.id)) {
                continue;
            }

            if self.control.is_paused() {
                progress.status = BatchStatus::Paused;
                on_progress(&progress);
            }
            if self.control.checkpoint().await.is_err() {
                aborted = true;
                break;
            }
            progress.status = BatchStatus::Running;
            progress.current_model = Some(candidate.id.clone());
            progress.current_scenario = Some(scenario.id.clone());
            progress.current_phase = None;
            progress.current_exchange = None;
            progress.total_exchanges = None;
            on_progress(&progress);

            let ctx = RunContext {
                gateway: self.gateway,
                candidate,
                synthetic_user: &plan.synthetic_user,
                judge: &plan.judge,
                scenario,
                config: self.config,
                control: &self.control,
            };
            let mut run = {
                let mut forward = |update: PhaseProgress| {
                    progress.apply(update);
                    on_progress(&progress);
                };
                run_evaluation(&ctx, &mut forward).await
            };

            if self.control.is_aborted() && run.status == RunStatus::Failed {
                info!(run = %run.id, "discarding run interrupted by abort");
                aborted = true;
                break;
            }

            if run.is_judgeable() && !self.control.is_aborted() {
                progress.apply(PhaseProgress::phase(EvalPhase::Judging));
                on_progress(&progress);
                match judge.judge_run(&run).await {
                    Ok(judgement) => run.record_judgement(judgement.report, judgement.usage)?,
                    Err(err) => {
                        warn!(run = %run.id, error = %err, "judge call failed; run left unjudged");
                        run.record_judge_error(err.to_string());
                    }
                }
            }

            info!(
                run = %run.id,
                model = %candidate,
                scenario = %scenario.id,
                status = run.status.as_str(),
                "run finished"
            );
            runs.push(run);
            progress.completed_runs += 1;
            let board = leaderboard::build(&runs, &plan.candidates);
            self.save_snapshot(&runs, &board, SnapshotStatus::InProgress);
            on_progress(&progress);
        }

        let board = leaderboard::build(&runs, &plan.candidates);
        let all_failed = !runs.is_empty() && runs.iter().all(|r| r.status == RunStatus::Failed);
        let (status, error) = if aborted {
            (BatchStatus::Aborted, None)
        } else if all_failed {
            (BatchStatus::Failed, runs.first().and_then(|r| r.error.clone()))
        } else {
            (BatchStatus::Completed, None)
        };
        self.save_snapshot(&runs, &board, SnapshotStatus::Completed);

        progress.status = status;
        progress.current_phase = None;
        progress.current_exchange = None;
        progress.total_exchanges = None;
        progress.error_message = error.clone();
        on_progress(&progress);
        info!(status = status.as_str(), runs = runs.len(), "batch finished");

        Ok(BatchOutcome {
            runs,
            leaderboard: board,
            status,
            error,
        })
    }
}
