//! Turn raw judge output into a validated report

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use super::rubric::Rubric;
use super::types::{
    AtomicClaims, Issue, JudgeReport, Metric, MetricScore, MetricScores, SCORE_MAX, SCORE_MIDPOINT,
    SCORE_MIN,
};
use crate::json_repair::{count_field, list_field, number_of, parse_lenient, pick, string_field, string_of};

/// Fewer distinct metric values than this raises a bias warning
pub const MIN_DISTINCT_SCORES: usize = 3;

/// Coerce a raw score: numbers and numeric strings are clamped to 0-10,
/// anything else is `None`
pub fn coerce_score(value: &Value) -> Option<f64> {
    number_of(value)
        .filter(|n| n.is_finite())
        .map(|n| n.clamp(SCORE_MIN, SCORE_MAX))
}

/// Parse judge output. Never fails: unparseable text yields an all-zero
/// report flagged with `parse_failed`.
pub fn parse_report(text: &str, rubric: &Rubric) -> JudgeReport {
    let value = match parse_lenient(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "judge output unparseable");
            return JudgeReport::parse_failure(err);
        }
    };

    let metrics_value = pick(&value, &["metrics", "scores", "metric_scores", "metricScores"])
        .filter(|v| v.is_object())
        .unwrap_or(&value);

    let mut general_comments = list_field(
        &value,
        &["general_comments", "generalComments", "comments", "general"],
    );

    let mut metrics = MetricScores::default();
    for metric in Metric::ALL {
        let (score, note) = metric_score(metrics_value, metric);
        if let Some(note) = note {
            general_comments.push(note);
        }
        *metrics.get_mut(metric) = score;
    }

    let overall_score = rubric.weighted_overall(&metrics);

    if let Some(warning) = anchoring_warning(&metrics) {
        general_comments.push(warning);
    }

    JudgeReport {
        metrics,
        overall_score,
        atomic_claims: atomic_claims(&value),
        general_comments,
        pros: list_field(&value, &["pros", "strengths"]),
        cons: list_field(&value, &["cons", "weaknesses"]),
        issues: issues(&value),
        parse_failed: false,
    }
}

fn metric_score(metrics: &Value, metric: Metric) -> (MetricScore, Option<String>) {
    let Some(entry) = pick(metrics, metric.aliases()) else {
        return (
            MetricScore::new(SCORE_MIDPOINT),
            Some(format!(
                "{} score missing; defaulted to {}",
                metric, SCORE_MIDPOINT
            )),
        );
    };

    let (raw, justification, evidence) = match entry {
        Value::Object(_) => (
            pick(entry, &["score", "value", "rating"]).cloned().unwrap_or(Value::Null),
            string_field(entry, &["justification", "reason", "rationale", "explanation"]),
            list_field(entry, &["evidence", "quotes", "excerpts"]),
        ),
        other => (other.clone(), String::new(), Vec::new()),
    };

    match coerce_score(&raw) {
        Some(score) => (
            MetricScore {
                score,
                justification,
                evidence,
            },
            None,
        ),
        None => (
            MetricScore {
                score: SCORE_MIDPOINT,
                justification,
                evidence,
            },
            Some(format!(
                "{} score {} is not numeric; defaulted to {}",
                metric,
                string_of(&raw).unwrap_or_else(|| raw.to_string()),
                SCORE_MIDPOINT
            )),
        ),
    }
}

/// Detection-only check for scores anchored on one or two values
pub fn anchoring_warning(metrics: &MetricScores) -> Option<String> {
    let distinct: HashSet<i64> = metrics
        .iter()
        .map(|(_, s)| (s.score * 1000.0).round() as i64)
        .collect();
    (distinct.len() < MIN_DISTINCT_SCORES).then(|| {
        format!(
            "Bias warning: only {} distinct metric score(s); the judge may be anchoring",
            distinct.len()
        )
    })
}

fn atomic_claims(value: &Value) -> Option<AtomicClaims> {
    let claims = pick(value, &["atomic_claims", "atomicClaims", "claims"])?;
    let user_stated = count_field(claims, &["user_stated", "userStated", "stated"]);
    let captured = count_field(claims, &["captured", "captured_in_profile", "capturedInProfile"]);
    let unsupported = count_field(claims, &["unsupported", "unsupported_in_profile", "unsupportedInProfile"]);
    if user_stated.is_none() && captured.is_none() && unsupported.is_none() {
        return None;
    }
    Some(AtomicClaims {
        user_stated: user_stated.unwrap_or_default(),
        captured: captured.unwrap_or_default(),
        unsupported: unsupported.unwrap_or_default(),
    })
}

fn issues(value: &Value) -> Vec<Issue> {
    let Some(Value::Array(items)) = pick(value, &["issues", "pinpointed_issues", "pinpointedIssues"])
    else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => {
                let issue = Issue {
                    location: string_field(item, &["location", "where", "turn"]),
                    quote: string_field(item, &["quote", "phrase", "excerpt"]),
                    severity: string_field(item, &["severity", "level"]),
                    fix: string_field(item, &["fix", "suggested_fix", "suggestedFix", "suggestion"]),
                };
                (!issue.quote.is_empty() || !issue.location.is_empty() || !issue.fix.is_empty())
                    .then_some(issue)
            }
            other => string_of(other).filter(|s| !s.is_empty()).map(|quote| Issue {
                quote,
                ..Issue::default()
            }),
        })
        .collect()
}
