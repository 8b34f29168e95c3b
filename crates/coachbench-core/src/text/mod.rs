//! Text helpers shared by profile normalization, the persona safeguards and
//! leaderboard feedback aggregation.

use std::collections::HashMap;

/// Case-folded, whitespace-collapsed key used for deduplication
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Drop empty and case-insensitive duplicate items, keeping the first casing
pub fn dedupe_case_insensitive<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(normalize_key(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Count of distinct non-empty items, compared case-insensitively
pub fn distinct_count<I, S>(items: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedupe_case_insensitive(items).len()
}

/// Rank items by case-insensitive frequency, most frequent first.
///
/// Ties keep the order of first occurrence and the first occurrence's casing
/// is what gets returned.
pub fn rank_by_frequency<I, S>(items: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items {
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = normalize_key(trimmed);
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push((key, trimmed.to_string()));
        }
        *count += 1;
    }

    // stable sort keeps first-occurrence order among equal counts
    order.sort_by(|a, b| counts[&b.0].cmp(&counts[&a.0]));
    order
        .into_iter()
        .take(limit)
        .map(|(_, original)| original)
        .collect()
}

/// Truncate to at most `max` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push('…');
    out
}

/// Case-folded word tokens with surrounding punctuation stripped
pub fn word_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
}
