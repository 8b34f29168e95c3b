//! Leaderboard aggregation
//!
//! The leaderboard is always rebuilt from the full list of runs. Only judged
//! runs contribute scores; models without one are left out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::judge::{Issue, JudgeReport, Metric};
use crate::model::ModelDescriptor;
use crate::run::Run;
use crate::text::rank_by_frequency;
use crate::usage::TokenUsage;

/// Feedback items kept per category
pub const TOP_FEEDBACK: usize = 5;

/// One scenario's contribution to an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioScore {
    pub scenario_id: String,
    pub scenario_name: String,
    pub run_id: String,
    pub overall_score: f64,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub model: ModelDescriptor,
    pub mean_overall: f64,
    pub mean_metrics: BTreeMap<Metric, f64>,
    /// Judged runs behind the means
    pub run_count: usize,
    /// Runs of this model that failed or were left unjudged
    #[serde(default)]
    pub unjudged_runs: usize,
    pub scenarios: Vec<ScenarioScore>,
    #[serde(default)]
    pub top_pros: Vec<String>,
    #[serde(default)]
    pub top_cons: Vec<String>,
    #[serde(default)]
    pub top_issues: Vec<String>,
}

/// Every model identifier seen, candidates first, in order of first appearance
fn model_order<'a>(runs: &'a [Run], candidates: &'a [ModelDescriptor]) -> Vec<&'a ModelDescriptor> {
    let mut seen: Vec<&ModelDescriptor> = Vec::new();
    for model in candidates.iter().chain(runs.iter().map(|r| &r.candidate)) {
        if !seen.iter().any(|m| m.id == model.id) {
            seen.push(model);
        }
    }
    seen
}

fn issue_text(issue: &Issue) -> String {
    if issue.location.is_empty() {
        issue.quote.clone()
    } else if issue.quote.is_empty() {
        issue.location.clone()
    } else {
        format!("{}: \"{}\"", issue.location, issue.quote)
    }
}

fn entry_for(model: &ModelDescriptor, runs: &[Run]) -> Option<LeaderboardEntry> {
    let own: Vec<&Run> = runs.iter().filter(|r| r.model_id() == model.id).collect();
    let judged: Vec<(&Run, &JudgeReport)> = own
        .iter()
        .filter_map(|r| r.judge_report.as_ref().map(|report| (*r, report)))
        .collect();
    if judged.is_empty() {
        return None;
    }
    let n = judged.len() as f64;

    let mean_overall = judged.iter().map(|(_, r)| r.overall_score).sum::<f64>() / n;
    let mean_metrics = Metric::ALL
        .iter()
        .map(|m| {
            let sum: f64 = judged.iter().map(|(_, r)| r.metrics.get(*m).score).sum();
            (*m, sum / n)
        })
        .collect();

    let scenarios = judged
        .iter()
        .map(|(run, report)| ScenarioScore {
            scenario_id: run.scenario_id.clone(),
            scenario_name: run.scenario_name.clone(),
            run_id: run.id.clone(),
            overall_score: report.overall_score,
            comments: report.general_comments.clone(),
            issues: report.issues.clone(),
            usage: run.usage.total(),
        })
        .collect();

    let top_pros = rank_by_frequency(judged.iter().flat_map(|(_, r)| r.pros.iter()), TOP_FEEDBACK);
    let top_cons = rank_by_frequency(judged.iter().flat_map(|(_, r)| r.cons.iter()), TOP_FEEDBACK);
    let top_issues = rank_by_frequency(
        judged
            .iter()
            .flat_map(|(_, r)| r.issues.iter().map(issue_text)),
        TOP_FEEDBACK,
    );

    Some(LeaderboardEntry {
        rank: 0,
        model: model.clone(),
        mean_overall,
        mean_metrics,
        run_count: judged.len(),
        unjudged_runs: own.len() - judged.len(),
        scenarios,
        top_pros,
        top_cons,
        top_issues,
    })
}

/// Build the ranked leaderboard.
///
/// Entries are sorted by mean overall score, highest first; ties keep the
/// order in which the models first appeared. Ranks run 1..=N.
pub fn build(runs: &[Run], candidates: &[ModelDescriptor]) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = model_order(runs, candidates)
        .into_iter()
        .filter_map(|model| entry_for(model, runs))
        .collect();

    entries.sort_by(|a, b| b.mean_overall.total_cmp(&a.mean_overall));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}
