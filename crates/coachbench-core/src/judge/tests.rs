//! Tests for judge module.

use super::*;
use crate::gateway::{CallParams, GatewayError, MockGateway};
use crate::model::ModelDescriptor;
use crate::run::Run;
use crate::scenario::Scenario;
use crate::transcript::{DiscoveryStage, MessageRole, PhaseTag};
use serde_json::json;

fn rubric() -> Rubric {
    Rubric::standard()
}

fn full_response() -> serde_json::Value {
    let m = |score: f64| json!({"score": score, "justification": "j", "evidence": ["COACH: hi"]});
    json!({
        "atomic_claims": {"user_stated": 12, "captured": 9, "unsupported": 2},
        "metrics": {
            "clarity": m(8.0),
            "structural_correctness": m(9.0),
            "consistency": m(7.0),
            "coverage": m(7.5),
            "hallucination": m(6.0),
            "decision_expertise": m(5.0),
            "safety": m(10.0)
        },
        "general_comments": ["Good structure"],
        "pros": ["Warm"],
        "cons": ["Long turns"],
        "issues": [{"location": "[Discovery/stories #8]", "quote": "you must", "severity": "major", "fix": "Invite instead"}]
    })
}

fn weighted(report: &JudgeReport) -> f64 {
    let r = rubric();
    Metric::ALL
        .iter()
        .map(|m| report.metrics.get(*m).score * r.weight(*m))
        .sum::<f64>()
}

#[test]
fn test_known_good_response_round_trips_scores() {
    let report = parse_report(&full_response().to_string(), &rubric());
    assert!(!report.parse_failed);
    assert_eq!(report.metrics.clarity.score, 8.0);
    assert_eq!(report.metrics.coverage.score, 7.5);
    assert_eq!(report.metrics.safety.evidence, vec!["COACH: hi"]);
    assert_eq!(report.metrics.hallucination.justification, "j");
    assert!((report.overall_score - weighted(&report)).abs() < 1e-6);
    assert_eq!(report.general_comments, vec!["Good structure"]);
    assert_eq!(report.issues[0].severity, "major");

    let claims = report.atomic_claims.unwrap();
    assert_eq!(claims.user_stated, 12);
    assert_eq!(claims.coverage_ratio(), Some(0.75));
    assert!((claims.hallucination_ratio().unwrap() - 2.0 / 11.0).abs() < 1e-9);
}

#[test]
fn test_scores_are_clamped_and_coerced() {
    let text = r#"{"metrics": {
        "clarity": {"score": "8.5/10"},
        "structuralCorrectness": 14,
        "consistency": {"score": -3},
        "coverage": {"score": "high"},
        "hallucination": 6,
        "expertise": "7",
        "safety": {"score": 9}
    }}"#;
    let report = parse_report(text, &rubric());
    assert_eq!(report.metrics.clarity.score, 8.5);
    assert_eq!(report.metrics.structural_correctness.score, 10.0);
    assert_eq!(report.metrics.consistency.score, 0.0);
    assert_eq!(report.metrics.coverage.score, SCORE_MIDPOINT);
    assert_eq!(report.metrics.decision_expertise.score, 7.0);
    assert!(report
        .general_comments
        .iter()
        .any(|c| c.contains("coverage score high is not numeric")));
    for (_, score) in report.metrics.iter() {
        assert!((SCORE_MIN..=SCORE_MAX).contains(&score.score));
    }
}

#[test]
fn test_top_level_metrics_and_missing_metric() {
    let text = r#"Here you go:
    {"clarity": 7, "structural_correctness": 6, "consistency": 8, "coverage": 5,
     "hallucination": 9, "decision_expertise": 4, "pros": ["Calm"]}"#;
    let report = parse_report(text, &rubric());
    assert_eq!(report.metrics.hallucination.score, 9.0);
    assert_eq!(report.metrics.safety.score, SCORE_MIDPOINT);
    assert!(report
        .general_comments
        .iter()
        .any(|c| c.contains("safety score missing")));
    assert_eq!(report.pros, vec!["Calm"]);
}

#[test]
fn test_repair_path_handles_trailing_commas_and_single_quotes() {
    let text = "```json\n{'metrics': {'clarity': {'score': 8,}, 'safety': 9,}, 'pros': ['Kind',],}\n```";
    let report = parse_report(text, &rubric());
    assert!(!report.parse_failed);
    assert_eq!(report.metrics.clarity.score, 8.0);
    assert_eq!(report.metrics.safety.score, 9.0);
    assert_eq!(report.pros, vec!["Kind"]);
}

#[test]
fn test_single_quoted_reply_with_apostrophe_is_repaired() {
    let text = "{'metrics': {'clarity': {'score': 7, 'justification': 'The coach didn't rush',}, 'safety': 9,}, 'pros': ['warm',],}";
    let report = parse_report(text, &rubric());
    assert!(!report.parse_failed);
    assert_eq!(report.metrics.clarity.score, 7.0);
    assert_eq!(report.metrics.clarity.justification, "The coach didn't rush");
    assert_eq!(report.metrics.safety.score, 9.0);
    assert_eq!(report.pros, vec!["warm"]);
}

#[test]
fn test_total_parse_failure_yields_zero_report() {
    let report = parse_report("The session was fine, I'd give it a 7.", &rubric());
    assert!(report.parse_failed);
    assert_eq!(report.overall_score, 0.0);
    for (_, score) in report.metrics.iter() {
        assert_eq!(score.score, 0.0);
    }
    assert!(report.general_comments[0].contains("could not be parsed"));
}

#[test]
fn test_anchoring_warning_is_detection_only() {
    let text = r#"{"metrics": {"clarity": 8, "structural_correctness": 8, "consistency": 8,
        "coverage": 8, "hallucination": 7, "decision_expertise": 8, "safety": 8}}"#;
    let report = parse_report(text, &rubric());
    assert!(report
        .general_comments
        .iter()
        .any(|c| c.starts_with("Bias warning: only 2 distinct")));
    assert!((report.overall_score - weighted(&report)).abs() < 1e-6);

    let varied = parse_report(&full_response().to_string(), &rubric());
    assert!(!varied.general_comments.iter().any(|c| c.starts_with("Bias warning")));
}

#[test]
fn test_string_issues_and_comment_string() {
    let text = r#"{"metrics": {}, "general_comments": "one\ntwo", "issues": ["vague close", {"quote": "", "location": ""}]}"#;
    let report = parse_report(text, &rubric());
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].quote, "vague close");
    assert!(report.general_comments.starts_with(&["one".to_string(), "two".to_string()]));
}

fn sample_run() -> Run {
    let scenario: Scenario =
        serde_yaml::from_str("id: carpenter\nname: Restless carpenter\npersona: Mara\n").unwrap();
    let mut run = Run::new(
        &ModelDescriptor::new("mock", "coach"),
        &ModelDescriptor::new("mock", "persona"),
        &ModelDescriptor::new("mock", "judge"),
        &scenario,
    );
    let tag = PhaseTag::Discovery(DiscoveryStage::Intro);
    run.transcript
        .push(MessageRole::User, "I build furniture.", tag, Some(1))
        .unwrap();
    run.transcript
        .push(MessageRole::Assistant, "What do you enjoy most?", tag, Some(1))
        .unwrap();
    run.decision_messages
        .push(MessageRole::User, "Should I open a shop?", PhaseTag::Decision, None)
        .unwrap();
    run.discovery_profile.loves = vec!["woodwork".into()];
    run.complete().unwrap();
    run
}

#[test]
fn test_prompt_embeds_transcript_profiles_and_scenario() {
    let run = sample_run();
    let messages = build_judge_prompt(&run, &rubric());
    let user = &messages[1].content;
    assert!(user.contains("id: carpenter"));
    assert!(user.contains("[Discovery/intro #1] USER: I build furniture."));
    assert!(user.contains("[Decision #1] USER: Should I open a shop?"));
    assert!(user.contains("\"woodwork\""));
    assert!(user.contains("decision_expertise"));
}

#[tokio::test]
async fn test_judge_run_with_mock_gateway() {
    let gateway = MockGateway::new();
    let model = ModelDescriptor::new("mock", "judge");
    let params = CallParams {
        temperature: 0.0,
        max_tokens: 1000,
    };
    let engine = JudgeEngine::new(&gateway, &model, params).unwrap();
    let judgement = engine.judge_run(&sample_run()).await.unwrap();
    assert!(!judgement.report.parse_failed);
    assert_eq!(judgement.report.metrics.safety.score, 10.0);
    assert!(!judgement.usage.is_zero());
}

#[tokio::test]
async fn test_judge_gateway_error_propagates() {
    let gateway = MockGateway::new().with_override(|_| {
        Some(Err(GatewayError::Status {
            status: 500,
            body: "down".into(),
        }))
    });
    let model = ModelDescriptor::new("mock", "judge");
    let params = CallParams {
        temperature: 0.0,
        max_tokens: 1000,
    };
    let engine = JudgeEngine::new(&gateway, &model, params).unwrap();
    let err = engine.judge_run(&sample_run()).await.unwrap_err();
    assert_eq!(err.category(), "status");
}
