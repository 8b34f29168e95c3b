//! Human and JSON rendering of batch results

use coachbench_core::coordinator::BatchOutcome;
use coachbench_core::error::Result;
use coachbench_core::judge::Metric;
use coachbench_core::leaderboard::LeaderboardEntry;
use coachbench_core::progress::{BatchStatus, Progress};
use coachbench_core::run::Run;
use coachbench_core::text::truncate_chars;
use serde_json::json;

use crate::cli::{Cli, OutputFormat};

const MODEL_COLUMN: usize = 28;

fn metric_header(metric: Metric) -> &'static str {
    match metric {
        Metric::Clarity => "clar",
        Metric::StructuralCorrectness => "struct",
        Metric::Consistency => "cons",
        Metric::Coverage => "cover",
        Metric::Hallucination => "hallu",
        Metric::DecisionExpertise => "expert",
        Metric::Safety => "safety",
    }
}

pub fn leaderboard_table(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "No judged runs.\n".to_string();
    }
    let mut out = format!(
        "{:>4}  {:<width$}  {:>7}  {:>4}",
        "rank",
        "model",
        "overall",
        "runs",
        width = MODEL_COLUMN
    );
    for metric in Metric::ALL {
        out.push_str(&format!("  {:>6}", metric_header(metric)));
    }
    out.push('\n');

    for entry in entries {
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>7.2}  {:>4}",
            entry.rank,
            truncate_chars(&entry.model.display_name, MODEL_COLUMN),
            entry.mean_overall,
            entry.run_count,
            width = MODEL_COLUMN
        ));
        for metric in Metric::ALL {
            let mean = entry.mean_metrics.get(&metric).copied().unwrap_or_default();
            out.push_str(&format!("  {:>6.1}", mean));
        }
        out.push('\n');
    }
    out
}

fn feedback_block(entries: &[LeaderboardEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        if entry.top_pros.is_empty() && entry.top_cons.is_empty() && entry.top_issues.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{}\n", entry.model.display_name));
        for (label, items) in [
            ("+", &entry.top_pros),
            ("-", &entry.top_cons),
            ("!", &entry.top_issues),
        ] {
            for item in items {
                out.push_str(&format!("  {} {}\n", label, item));
            }
        }
    }
    out
}

fn run_summary(run: &Run) -> serde_json::Value {
    json!({
        "id": run.id,
        "model": run.candidate.to_string(),
        "scenario": run.scenario_id,
        "status": run.status.as_str(),
        "overall_score": run.judge_report.as_ref().map(|r| r.overall_score),
        "error": run.error,
        "judge_error": run.judge_error,
        "safeguards": run.safeguards,
        "usage": run.usage.total(),
    })
}

pub fn print_outcome(cli: &Cli, outcome: &BatchOutcome) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let output = json!({
                "status": outcome.status.as_str(),
                "error": outcome.error,
                "leaderboard": outcome.leaderboard,
                "runs": outcome.runs.iter().map(run_summary).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Human => {
            print!("{}", leaderboard_table(&outcome.leaderboard));
            if !cli.quiet {
                print!("{}", feedback_block(&outcome.leaderboard));
                let failed: Vec<&Run> = outcome.failed_runs().collect();
                if !failed.is_empty() {
                    println!("\nFailed runs:");
                    for run in failed {
                        println!(
                            "  {} / {}: {}",
                            run.candidate,
                            run.scenario_id,
                            run.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
                for run in outcome.runs.iter().filter(|r| r.judge_error.is_some()) {
                    println!(
                        "  unjudged {} / {}: {}",
                        run.candidate,
                        run.scenario_id,
                        run.judge_error.as_deref().unwrap_or_default()
                    );
                }
                if outcome.status == BatchStatus::Aborted {
                    println!("\nBatch aborted after {} run(s).", outcome.runs.len());
                }
            }
        }
    }
    Ok(())
}

pub fn print_leaderboard(cli: &Cli, entries: &[LeaderboardEntry]) -> Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
        OutputFormat::Human => {
            print!("{}", leaderboard_table(entries));
            if !cli.quiet {
                print!("{}", feedback_block(entries));
            }
        }
    }
    Ok(())
}

/// One progress line per run and phase change; exchanges are not printed
#[derive(Default)]
pub struct ProgressPrinter {
    last: Option<(Option<String>, Option<String>, Option<String>, BatchStatus)>,
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, progress: &Progress) -> Option<String> {
        let key = (
            progress.current_model.clone(),
            progress.current_scenario.clone(),
            progress.current_phase.map(|p| p.to_string()),
            progress.status,
        );
        if self.last.as_ref() == Some(&key) {
            return None;
        }
        self.last = Some(key);

        let position = format!(
            "[{}/{}]",
            (progress.completed_runs + 1).min(progress.total_runs.max(1)),
            progress.total_runs
        );
        let line = match (&progress.current_model, &progress.current_scenario, progress.status) {
            (_, _, BatchStatus::Paused) => format!("{} paused", position),
            (_, _, status @ (BatchStatus::Completed | BatchStatus::Aborted | BatchStatus::Failed)) => {
                format!("batch {} ({} run(s))", status.as_str(), progress.completed_runs)
            }
            (Some(model), Some(scenario), _) => match progress.current_phase {
                Some(phase) => format!("{} {} / {}: {}", position, model, scenario, phase),
                None => format!("{} {} / {}", position, model, scenario),
            },
            _ => format!("starting {} run(s)", progress.total_runs),
        };
        Some(line)
    }
}
