//! Tests for transcript ordering and rendering.

use super::*;
use crate::profile::BucketKind;

fn discovery(exchange: u32) -> PhaseTag {
    PhaseTag::Discovery(DiscoveryStage::for_exchange(exchange))
}

#[test]
fn test_stage_boundaries() {
    assert_eq!(DiscoveryStage::for_exchange(1), DiscoveryStage::Intro);
    assert_eq!(DiscoveryStage::for_exchange(3), DiscoveryStage::Intro);
    assert_eq!(DiscoveryStage::for_exchange(4), DiscoveryStage::EnergyMap);
    assert_eq!(DiscoveryStage::for_exchange(6), DiscoveryStage::EnergyMap);
    assert_eq!(DiscoveryStage::for_exchange(7), DiscoveryStage::Stories);
    assert_eq!(DiscoveryStage::for_exchange(9), DiscoveryStage::Stories);
    assert_eq!(DiscoveryStage::for_exchange(10), DiscoveryStage::YourWhy);
    assert_eq!(DiscoveryStage::for_exchange(12), DiscoveryStage::YourWhy);
}

#[test]
fn test_timestamps_strictly_increase() {
    let mut transcript = Transcript::new();
    for exchange in 1..=3 {
        transcript
            .push(MessageRole::User, "hi", discovery(exchange), Some(exchange))
            .unwrap();
        transcript
            .push(MessageRole::Assistant, "hello", discovery(exchange), Some(exchange))
            .unwrap();
    }
    let stamps: Vec<_> = transcript.messages().iter().map(|m| m.timestamp).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_discovery_exchange_must_increase_per_speaker() {
    let mut transcript = Transcript::new();
    transcript
        .push(MessageRole::User, "a", discovery(2), Some(2))
        .unwrap();
    assert!(transcript
        .push(MessageRole::User, "b", discovery(2), Some(2))
        .is_err());
    assert!(transcript
        .push(MessageRole::User, "b", discovery(1), Some(1))
        .is_err());
    assert!(transcript
        .push(MessageRole::Assistant, "c", discovery(2), Some(2))
        .is_ok());
}

#[test]
fn test_discovery_exchange_bounds() {
    let mut transcript = Transcript::new();
    assert!(transcript
        .push(MessageRole::User, "x", discovery(13), Some(13))
        .is_err());
    assert!(transcript
        .push(MessageRole::User, "x", discovery(0), Some(0))
        .is_err());
    assert!(transcript
        .push(MessageRole::User, "x", discovery(1), None)
        .is_err());
    assert!(transcript.is_empty());
}

#[test]
fn test_non_discovery_messages_skip_index_checks() {
    let mut transcript = Transcript::new();
    let bucket = PhaseTag::Bucket(BucketKind::Love);
    transcript.push(MessageRole::User, "x", bucket, None).unwrap();
    transcript.push(MessageRole::User, "y", bucket, None).unwrap();
    assert_eq!(transcript.in_phase(bucket).count(), 2);
    assert_eq!(transcript.discovery().count(), 0);
}

#[test]
fn test_render_labels_roles_and_exchanges() {
    let mut transcript = Transcript::new();
    transcript
        .push(MessageRole::User, "I teach chemistry.", discovery(1), Some(1))
        .unwrap();
    transcript
        .push(MessageRole::Assistant, "Tell me more.", discovery(1), Some(1))
        .unwrap();
    let bucket = PhaseTag::Bucket(BucketKind::WorldNeeds);
    transcript.push(MessageRole::User, "Clean water.", bucket, None).unwrap();
    transcript.push(MessageRole::Assistant, "Why?", bucket, None).unwrap();
    transcript.push(MessageRole::User, "Because.", bucket, None).unwrap();

    let rendered = render_labeled(transcript.messages());
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines[0], "[Discovery/intro #1] USER: I teach chemistry.");
    assert_eq!(lines[1], "[Discovery/intro #1] COACH: Tell me more.");
    assert_eq!(lines[2], "[Bucket/world_needs #1] USER: Clean water.");
    assert_eq!(lines[3], "[Bucket/world_needs #1] COACH: Why?");
    assert_eq!(lines[4], "[Bucket/world_needs #2] USER: Because.");
}

#[test]
fn test_phase_tag_serialization() {
    let tag = PhaseTag::Discovery(DiscoveryStage::EnergyMap);
    let json = serde_json::to_value(tag).unwrap();
    assert_eq!(json["phase"], "discovery");
    assert_eq!(json["stage"], "energy_map");

    let decision = serde_json::to_value(PhaseTag::Decision).unwrap();
    assert_eq!(decision["phase"], "decision");
}
