//! End-to-end batch tests against the offline mock gateway

use std::path::PathBuf;
use std::time::Duration;

use coachbench_core::config::EvalConfig;
use coachbench_core::control::BatchControl;
use coachbench_core::coordinator::{BatchPlan, Coordinator};
use coachbench_core::gateway::{CallPurpose, GatewayError, MockGateway};
use coachbench_core::model::{ModelDescriptor, ModelRole};
use coachbench_core::progress::{BatchStatus, Progress};
use coachbench_core::run::RunStatus;
use coachbench_core::scenario;
use coachbench_core::snapshot::{Snapshot, SnapshotStatus, SnapshotStore};
use coachbench_core::transcript::MessageRole;
use tempfile::tempdir;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/scenarios")
}

fn plan(candidates: &[&str]) -> BatchPlan {
    BatchPlan {
        candidates: candidates
            .iter()
            .map(|id| ModelDescriptor::new("mock", *id))
            .collect(),
        synthetic_user: ModelDescriptor::new("mock", "persona"),
        judge: ModelDescriptor::new("mock", "judge"),
        scenarios: scenario::load_dir(fixtures()).unwrap(),
    }
}

#[tokio::test]
async fn test_full_batch_is_judged_and_ranked() {
    let gateway = MockGateway::new();
    let config = EvalConfig::default();
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("snapshot.json"), 7200);
    let coordinator = Coordinator::new(&gateway, &config).with_snapshots(store.clone());

    let mut updates: Vec<Progress> = Vec::new();
    let outcome = coordinator
        .run_batch(&plan(&["coach-a", "coach-b"]), Vec::new(), &mut |p| {
            updates.push(p.clone())
        })
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Completed);
    assert_eq!(outcome.runs.len(), 6);
    assert!(outcome.runs.iter().all(|r| r.is_judged()));
    assert!(outcome.failure().is_none());

    let ranks: Vec<_> = outcome.leaderboard.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2]);
    assert_eq!(outcome.leaderboard[0].run_count, 3);

    let last = updates.last().unwrap();
    assert_eq!(last.completed_runs, 6);
    assert_eq!(last.total_runs, 6);
    assert!(updates.iter().any(|p| p.current_exchange == Some(12)));

    let snapshot = store.read().unwrap().unwrap();
    assert_eq!(snapshot.status, SnapshotStatus::Completed);
    assert_eq!(snapshot.runs.len(), 6);
    assert_eq!(snapshot.leaderboard.len(), 2);
}

#[tokio::test]
async fn test_empty_reply_at_exchange_five_reaches_exchange_twelve() {
    let gateway = MockGateway::new().with_override(|request| match request.purpose {
        CallPurpose::DiscoveryTurn { exchange: 5 } => Some(Ok(String::new())),
        _ => None,
    });
    let config = EvalConfig {
        scenarios_per_model: 1,
        ..EvalConfig::default()
    };
    let outcome = Coordinator::new(&gateway, &config)
        .run_batch(&plan(&["coach-a"]), Vec::new(), &mut |_| {})
        .await
        .unwrap();

    let run = &outcome.runs[0];
    assert_eq!(run.status, RunStatus::Completed);
    let exchanges: Vec<u32> = run
        .transcript
        .discovery()
        .filter(|m| m.role == MessageRole::Assistant)
        .filter_map(|m| m.exchange)
        .collect();
    assert_eq!(exchanges, (1..=12).collect::<Vec<_>>());
    assert!(run.is_judged());
}

#[tokio::test]
async fn test_abort_after_two_of_six_runs() {
    let gateway = MockGateway::new();
    let config = EvalConfig::default();
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("snapshot.json"), 7200);
    let control = BatchControl::new();
    let coordinator = Coordinator::new(&gateway, &config)
        .with_control(control.clone())
        .with_snapshots(store.clone());

    let outcome = coordinator
        .run_batch(&plan(&["coach-a", "coach-b"]), Vec::new(), &mut |p| {
            if p.completed_runs == 2 {
                control.abort();
            }
        })
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Aborted);
    assert_eq!(outcome.runs.len(), 2);
    assert!(outcome
        .runs
        .iter()
        .all(|r| r.status == RunStatus::Completed && r.is_judged()));
    assert_eq!(store.read().unwrap().unwrap().runs.len(), 2);
}

#[tokio::test]
async fn test_abort_mid_run_discards_partial_run() {
    let gateway = MockGateway::new();
    let config = EvalConfig::default();
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("snapshot.json"), 7200);
    let control = BatchControl::new();
    let coordinator = Coordinator::new(&gateway, &config)
        .with_control(control.clone())
        .with_snapshots(store.clone());

    let outcome = coordinator
        .run_batch(&plan(&["coach-a", "coach-b"]), Vec::new(), &mut |p| {
            if p.completed_runs == 2 && p.current_exchange == Some(4) {
                control.abort();
            }
        })
        .await
        .unwrap();

    assert!(control.is_aborted());
    assert_eq!(outcome.status, BatchStatus::Aborted);
    assert_eq!(outcome.runs.len(), 2);
    assert!(outcome.runs.iter().all(|r| r.status == RunStatus::Completed));

    let snapshot = store.read().unwrap().unwrap();
    let saved: Vec<&str> = snapshot.runs.iter().map(|r| r.id.as_str()).collect();
    let kept: Vec<&str> = outcome.runs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(saved, kept);
}

#[tokio::test]
async fn test_every_run_failing_surfaces_first_error() {
    let gateway = MockGateway::new().with_override(|request| {
        (request.role == ModelRole::Candidate).then(|| {
            Err(GatewayError::Status {
                status: 401,
                body: "invalid api key".into(),
            })
        })
    });
    let config = EvalConfig::default();
    let outcome = Coordinator::new(&gateway, &config)
        .run_batch(&plan(&["coach-a", "coach-b"]), Vec::new(), &mut |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.runs.len(), 6);
    assert_eq!(outcome.failed_runs().count(), 6);
    assert!(outcome.leaderboard.is_empty());
    assert_eq!(outcome.status, BatchStatus::Failed);
    let message = outcome.failure().unwrap().to_string();
    assert!(message.contains("provider returned 401: invalid api key"), "{message}");
    assert_eq!(gateway.count(|c| c.purpose == CallPurpose::Judge), 0);
}

#[tokio::test]
async fn test_missing_credential_fails_before_any_call() {
    let gateway = MockGateway::new().without_credential(ModelRole::SyntheticUser);
    let config = EvalConfig::default();
    let err = Coordinator::new(&gateway, &config)
        .run_batch(&plan(&["coach-a"]), Vec::new(), &mut |_| {})
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), coachbench_core::error::ExitCode::Usage);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_judge_failure_leaves_runs_unjudged() {
    let gateway = MockGateway::new().with_override(|request| match request.purpose {
        CallPurpose::Judge => Some(Err(GatewayError::Transport("connection reset".into()))),
        _ => None,
    });
    let config = EvalConfig {
        scenarios_per_model: 2,
        ..EvalConfig::default()
    };
    let outcome = Coordinator::new(&gateway, &config)
        .run_batch(&plan(&["coach-a"]), Vec::new(), &mut |_| {})
        .await
        .unwrap();

    assert_eq!(outcome.status, BatchStatus::Completed);
    assert!(outcome.runs.iter().all(|r| r.status == RunStatus::Completed));
    assert!(outcome.runs.iter().all(|r| !r.is_judged()));
    assert!(outcome.runs[0]
        .judge_error
        .as_deref()
        .unwrap()
        .contains("connection reset"));
    assert!(outcome.leaderboard.is_empty());
}

#[tokio::test]
async fn test_pause_holds_batch_until_resume() {
    let gateway = MockGateway::new();
    let config = EvalConfig {
        scenarios_per_model: 1,
        ..EvalConfig::default()
    };
    let control = BatchControl::new();
    control.pause();
    let coordinator = Coordinator::new(&gateway, &config).with_control(control.clone());

    let mut statuses = Vec::new();
    let mut record = |p: &Progress| statuses.push(p.status);
    let plan = plan(&["coach-a"]);
    let batch = coordinator.run_batch(&plan, Vec::new(), &mut record);
    let driver = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let calls_while_paused = gateway.calls().len();
        control.resume();
        calls_while_paused
    };
    let (outcome, calls_while_paused) = tokio::join!(batch, driver);

    assert_eq!(calls_while_paused, 0);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.runs.len(), 1);
    assert!(statuses.contains(&BatchStatus::Paused));
    assert_eq!(statuses.last(), Some(&BatchStatus::Completed));
}

#[tokio::test]
async fn test_resume_skips_pairs_in_snapshot() {
    let config = EvalConfig::default();
    let dir = tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("snapshot.json"), 7200);
    let plan = plan(&["coach-a"]);

    let first = MockGateway::new();
    let earlier = Coordinator::new(&first, &config)
        .run_batch(&plan, Vec::new(), &mut |_| {})
        .await
        .unwrap();
    let kept: Vec<_> = earlier.runs.into_iter().take(2).collect();
    store
        .save(&Snapshot::new(kept.clone(), Vec::new(), SnapshotStatus::InProgress))
        .unwrap();

    let gateway = MockGateway::new();
    let mut first_progress = None;
    let outcome = Coordinator::new(&gateway, &config)
        .with_snapshots(store.clone())
        .run_batch(&plan, store.resumable_runs().unwrap(), &mut |p| {
            first_progress.get_or_insert(p.completed_runs);
        })
        .await
        .unwrap();

    assert_eq!(first_progress, Some(2));
    assert_eq!(outcome.runs.len(), 3);
    assert_eq!(outcome.runs[0].id, kept[0].id);
    assert_eq!(gateway.count(|c| c.purpose == CallPurpose::Judge), 1);
    assert_eq!(outcome.leaderboard[0].run_count, 3);
}
