//! Plain-text rendering of transcripts for judge and extraction prompts

use std::collections::HashMap;

use super::types::{MessageRole, PhaseTag, TranscriptMessage};

/// Render messages with a `[phase #exchange] ROLE:` label per turn.
///
/// Messages without a stored exchange index get one computed by counting user
/// turns within the same phase tag.
pub fn render_labeled<'a, I>(messages: I) -> String
where
    I: IntoIterator<Item = &'a TranscriptMessage>,
{
    let mut counters: HashMap<PhaseTag, u32> = HashMap::new();
    let mut lines = Vec::new();

    for message in messages {
        let counter = counters.entry(message.phase).or_insert(0);
        if message.role == MessageRole::User {
            *counter += 1;
        }
        let exchange = message.exchange.unwrap_or((*counter).max(1));
        lines.push(format!(
            "[{} #{}] {}: {}",
            message.phase.label(),
            exchange,
            message.role.label(),
            message.content.trim()
        ));
    }

    lines.join("\n")
}
