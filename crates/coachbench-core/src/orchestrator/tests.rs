//! Tests for the phase orchestrator.

use super::*;
use crate::gateway::{GatewayError, MockGateway};
use crate::profile::{BucketKind, BucketSource};
use crate::prompts::WHY_MARKER;
use crate::run::RunStatus;
use crate::transcript::{PhaseTag, DISCOVERY_EXCHANGES};

fn scenario() -> Scenario {
    Scenario {
        id: "career-switch".into(),
        name: "Career switch".into(),
        persona: "Dana, 34, project coordinator who cooks for the whole street".into(),
        constraints: vec!["Supports a younger brother".into()],
        goals: vec!["Work that feels meaningful".into()],
        conflicts: vec![],
        red_lines: vec![],
        starter_context: String::new(),
        decision: Some("Should I take the evening design course?".into()),
    }
}

fn models() -> (ModelDescriptor, ModelDescriptor, ModelDescriptor) {
    (
        ModelDescriptor::new("mock", "coach-a"),
        ModelDescriptor::new("mock", "persona"),
        ModelDescriptor::new("mock", "judge"),
    )
}

async fn run_with(gateway: &MockGateway, scenario: &Scenario, config: &EvalConfig, control: &BatchControl) -> (Run, Vec<PhaseProgress>) {
    let (candidate, synthetic_user, judge) = models();
    let ctx = RunContext {
        gateway,
        candidate: &candidate,
        synthetic_user: &synthetic_user,
        judge: &judge,
        scenario,
        config,
        control,
    };
    let mut seen = Vec::new();
    let run = run_evaluation(&ctx, &mut |p| seen.push(p)).await;
    (run, seen)
}

#[tokio::test]
async fn test_full_protocol_with_mock_gateway() {
    let gateway = MockGateway::new();
    let (run, seen) = run_with(&gateway, &scenario(), &EvalConfig::default(), &BatchControl::new()).await;

    assert_eq!(run.status, RunStatus::Completed, "{:?}", run.error);

    let discovery: Vec<_> = run.transcript.discovery().collect();
    assert_eq!(discovery.len(), 2 * DISCOVERY_EXCHANGES as usize);
    for (i, pair) in discovery.chunks(2).enumerate() {
        let exchange = i as u32 + 1;
        assert_eq!(pair[0].role, MessageRole::User);
        assert_eq!(pair[1].role, MessageRole::Assistant);
        assert_eq!(pair[0].exchange, Some(exchange));
        assert_eq!(pair[1].exchange, Some(exchange));
    }
    let closing = &discovery.last().unwrap().content;
    assert!(closing.starts_with(WHY_MARKER));
    assert!(!closing.ends_with('?'));

    assert_eq!(run.discovery_profile.loves.len(), 3);
    let profile = &run.bucket_profile;
    assert_eq!(profile.love.source, BucketSource::AutoFill);
    assert_eq!(profile.good_at.source, BucketSource::AutoFill);
    assert_eq!(profile.world_needs.source, BucketSource::Dialogue);
    assert_eq!(profile.world_needs.answers, 3);
    assert!(!profile.world_needs.cap_hit);
    assert!(profile.all_complete());
    assert!(!profile.overlaps.passion.is_empty());

    assert_eq!(run.decision_messages.len(), 6);
    assert_eq!(
        run.decision_messages.messages()[0].content,
        "Should I take the evening design course?"
    );

    assert!(!run.usage.phase(EvalPhase::Discovery).get(ModelRole::Candidate).is_zero());
    assert!(!run.usage.phase(EvalPhase::Decision).get(ModelRole::SyntheticUser).is_zero());
    assert!(run.usage.phase(EvalPhase::Judging).total().is_zero());

    assert!(seen.contains(&PhaseProgress::exchange(EvalPhase::Discovery, 12, Some(12))));
    assert!(seen.contains(&PhaseProgress::phase(EvalPhase::Decision)));

    // love and good-at never reach the coach as sub-dialogues
    assert_eq!(
        gateway.count(|c| c.purpose == CallPurpose::BucketTurn { bucket: BucketKind::Love }),
        0
    );
    assert!(gateway.count(|c| c.role == ModelRole::SyntheticUser && c.temperature == 0.0) > 0);
}

#[tokio::test]
async fn test_empty_candidate_reply_does_not_stop_discovery() {
    let gateway = MockGateway::new().with_override(|request| match request.purpose {
        CallPurpose::DiscoveryTurn { exchange: 5 } => Some(Err(GatewayError::EmptyResponse)),
        _ => None,
    });
    let (run, _) = run_with(&gateway, &scenario(), &EvalConfig::default(), &BatchControl::new()).await;

    assert_eq!(run.status, RunStatus::Completed);
    let fifth = run
        .transcript
        .discovery()
        .find(|m| m.role == MessageRole::Assistant && m.exchange == Some(5))
        .unwrap();
    assert!(fifth.content.is_empty());
    assert!(run
        .transcript
        .discovery()
        .any(|m| m.role == MessageRole::Assistant && m.exchange == Some(12)));
}

#[tokio::test]
async fn test_gateway_failure_fails_run_and_keeps_partial_transcript() {
    let gateway = MockGateway::new().with_override(|request| match request.purpose {
        CallPurpose::BucketTurn { .. } => Some(Err(GatewayError::Status {
            status: 503,
            body: "overloaded".into(),
        })),
        _ => None,
    });
    let (run, _) = run_with(&gateway, &scenario(), &EvalConfig::default(), &BatchControl::new()).await;

    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.as_deref().unwrap().contains("503"));
    assert_eq!(run.transcript.discovery().count(), 24);
    assert!(run.decision_messages.is_empty());
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_aborted_control_fails_run_before_any_call() {
    let gateway = MockGateway::new();
    let control = BatchControl::new();
    control.abort();
    let (run, _) = run_with(&gateway, &scenario(), &EvalConfig::default(), &control).await;

    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.transcript.is_empty());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_deflected_answers_run_bucket_to_cap() {
    let gateway = MockGateway::new().with_override(|request| match request.purpose {
        CallPurpose::Persona => Some(Ok("? anyway".to_string())),
        _ => None,
    });
    let config = EvalConfig {
        bucket_exchange_cap: 4,
        ..EvalConfig::default()
    };
    let (run, _) = run_with(&gateway, &scenario(), &config, &BatchControl::new()).await;

    assert_eq!(run.status, RunStatus::Completed);
    let needs = &run.bucket_profile.world_needs;
    assert!(needs.cap_hit);
    assert_eq!(needs.answers, 0);
    assert_eq!(
        run.transcript
            .in_phase(PhaseTag::Bucket(BucketKind::WorldNeeds))
            .count(),
        8
    );
    assert!(run.safeguards.dangling_punctuation > 0);
}

#[tokio::test]
async fn test_starter_context_opens_discovery() {
    let mut scenario = scenario();
    scenario.starter_context = "I keep wondering if I'm in the wrong job.".into();
    let gateway = MockGateway::new();
    let (run, _) = run_with(&gateway, &scenario, &EvalConfig::default(), &BatchControl::new()).await;

    assert_eq!(
        run.transcript.messages()[0].content,
        "I keep wondering if I'm in the wrong job."
    );
    assert_eq!(
        gateway.count(|c| c.role == ModelRole::SyntheticUser),
        11 + 6 + 2
    );
}

#[tokio::test]
async fn test_unparseable_extraction_yields_empty_profile() {
    let gateway = MockGateway::new().with_override(|request| match request.purpose {
        CallPurpose::Extraction => Some(Ok("I could not find anything.".to_string())),
        _ => None,
    });
    let (run, _) = run_with(&gateway, &scenario(), &EvalConfig::default(), &BatchControl::new()).await;

    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.discovery_profile.is_empty());
    assert_eq!(run.bucket_profile.love.source, BucketSource::Dialogue);
    assert!(run.bucket_profile.love.complete);
}

#[tokio::test]
async fn test_merged_summary_keeps_dialogue_answers() {
    let gateway = MockGateway::new().with_override(|request| match request.purpose {
        CallPurpose::BucketSummary(BucketKind::WorldNeeds) => {
            Some(Ok(r#"{"causes": ["helping people"]}"#.to_string()))
        }
        _ => None,
    });
    let (run, _) = run_with(&gateway, &scenario(), &EvalConfig::default(), &BatchControl::new()).await;

    assert_eq!(run.status, RunStatus::Completed);
    let needs = &run.bucket_profile.world_needs;
    assert_eq!(needs.answers, 3);
    assert!(!needs.cap_hit);
    assert!(needs.complete);
    assert_eq!(needs.bullets[0], "helping people");
    assert!(needs.bullets.len() >= 3);
}
