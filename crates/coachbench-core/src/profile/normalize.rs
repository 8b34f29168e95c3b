//! Fold model-produced JSON into profile types.

use serde_json::Value;

use super::types::{Bucket, BucketKind, DiscoveryProfile, OverlapArea, OverlapKind, Overlaps};
use crate::json_repair::{list_field, pick, string_field, string_list, string_of};

const SUMMARY_KEYS: &[&str] = &["summary", "overview", "bucket_summary", "market_summary"];
const GENERIC_BULLET_KEYS: &[&str] = &["bullets", "items", "points"];

pub fn normalize_discovery(value: &Value) -> DiscoveryProfile {
    DiscoveryProfile {
        summary: string_field(value, &["summary", "profile_summary", "derived_summary"]),
        patterns: list_field(value, &["patterns", "observed_patterns", "themes"]),
        purpose_statement: string_field(
            value,
            &[
                "why_statement",
                "purpose_statement",
                "whyStatement",
                "purposeStatement",
                "statement",
            ],
        ),
        explanation: string_field(
            value,
            &["why_explanation", "explanation", "whyExplanation"],
        ),
        loves: list_field(value, &["loves", "loved", "love", "things_loved"]),
        good_at: list_field(value, &["good_at", "goodAt", "strengths", "skills"]),
    }
}

/// Normalize one of the four bucket-specific summary shapes.
///
/// - love: `{"loves": [..], "summary": ".."}`
/// - good at: `{"skills": [{"skill": "..", "evidence": ".."}], "summary": ".."}`
/// - world needs: `{"causes": [..], "problems": [..], "summary": ".."}`
/// - paid for: `{"offers": [{"offer": "..", "audience": ".."}], "market_summary": ".."}`
///
/// Any shape also accepts a generic `bullets` list.
pub fn normalize_bucket(kind: BucketKind, value: &Value) -> Bucket {
    let mut bullets = match kind {
        BucketKind::Love => list_field(value, &["loves", "love", "activities"]),
        BucketKind::GoodAt => paired_items(
            value,
            &["skills", "strengths", "good_at"],
            &["skill", "strength", "name"],
            &["evidence", "example"],
            |skill, evidence| format!("{} ({})", skill, evidence),
        ),
        BucketKind::WorldNeeds => {
            let mut items = list_field(value, &["causes", "needs"]);
            items.extend(list_field(value, &["problems", "issues"]));
            items
        }
        BucketKind::PaidFor => paired_items(
            value,
            &["offers", "services", "paid_for"],
            &["offer", "service", "name"],
            &["audience", "customer", "market"],
            |offer, audience| format!("{} for {}", offer, audience),
        ),
    };
    if bullets.is_empty() {
        bullets = list_field(value, GENERIC_BULLET_KEYS);
    }

    Bucket::new(bullets, string_field(value, SUMMARY_KEYS))
}

/// Items that are either plain strings or `{primary, detail}` objects
fn paired_items(
    value: &Value,
    list_keys: &[&str],
    primary_keys: &[&str],
    detail_keys: &[&str],
    join: impl Fn(&str, &str) -> String,
) -> Vec<String> {
    let Some(Value::Array(items)) = pick(value, list_keys) else {
        return list_field(value, list_keys);
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => {
                let primary = string_field(item, primary_keys);
                let detail = string_field(item, detail_keys);
                match (primary.is_empty(), detail.is_empty()) {
                    (true, _) => None,
                    (false, true) => Some(primary),
                    (false, false) => Some(join(&primary, &detail)),
                }
            }
            other => string_of(other).filter(|s| !s.is_empty()),
        })
        .collect()
}

/// Normalize the overlap pass: four named sub-objects
pub fn normalize_overlaps(value: &Value) -> Overlaps {
    let mut overlaps = Overlaps::default();
    for kind in OverlapKind::ALL {
        if let Some(area) = value.get(kind.as_str()) {
            *overlaps.get_mut(kind) = overlap_area(area);
        }
    }
    overlaps
}

fn overlap_area(value: &Value) -> OverlapArea {
    match value {
        Value::Object(_) => OverlapArea {
            bullets: list_field(value, &["bullets", "items", "points"]),
            summary: string_field(value, &["summary", "description"]),
        },
        Value::Array(_) => OverlapArea {
            bullets: string_list(value),
            summary: String::new(),
        },
        other => OverlapArea {
            bullets: Vec::new(),
            summary: string_of(other).unwrap_or_default(),
        },
    }
}
