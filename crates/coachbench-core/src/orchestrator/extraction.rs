//! Structured model passes and closing-turn enforcement

use serde_json::Value;
use tracing::{debug, warn};

use super::Session;
use crate::error::{EvalError, Result};
use crate::gateway::{CallParams, CallPurpose, CallRequest, ChatMessage, GatewayError};
use crate::json_repair::parse_lenient;
use crate::model::ModelRole;
use crate::prompts::WHY_MARKER;
use crate::usage::EvalPhase;

const MISSING_STATEMENT: &str = "(no statement was given).";

/// Leading hedges dropped before a statement that lacks the marker
const OPENERS: &[&str] = &[
    "it seems to me",
    "it sounds like",
    "i believe",
    "i think",
    "i sense",
    "i feel",
    "i hear",
    "it seems",
];

/// Purpose leads that duplicate the marker once the opener is gone
const PURPOSE_LEADS: &[&str] = &[
    "your purpose is to",
    "you're here to",
    "you are here to",
    "you want to",
    "that",
    "to",
];

impl<'c, 'a> Session<'c, 'a> {
    /// Run a JSON-returning pass against the candidate model.
    ///
    /// Returns `None` when the reply is empty or cannot be parsed even after
    /// repair; the caller falls back to an empty structure.
    pub(super) async fn structured_pass(
        &mut self,
        phase: EvalPhase,
        messages: Vec<ChatMessage>,
        purpose: CallPurpose,
    ) -> Result<Option<Value>> {
        let request = CallRequest {
            role: ModelRole::Candidate,
            model: self.ctx.candidate,
            messages: &messages,
            params: CallParams {
                temperature: self.ctx.config.judge_temperature,
                max_tokens: self.ctx.config.max_tokens.extraction,
            },
            purpose,
        };
        let completion = match self.ctx.gateway.call(&request).await {
            Ok(completion) => completion,
            Err(GatewayError::EmptyResponse) => {
                warn!(run = %self.run.id, purpose = %purpose, "structured pass returned nothing");
                return Ok(None);
            }
            Err(err) => return Err(EvalError::Gateway(err)),
        };
        self.run
            .record_usage(phase, ModelRole::Candidate, completion.usage)?;

        match parse_lenient(&completion.text) {
            Ok(value) => {
                debug!(run = %self.run.id, purpose = %purpose, "structured pass parsed");
                Ok(Some(value))
            }
            Err(err) => {
                warn!(run = %self.run.id, purpose = %purpose, error = %err, "structured pass unparseable");
                Ok(None)
            }
        }
    }
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let (hay, pat) = (haystack.as_bytes(), needle.as_bytes());
    if pat.is_empty() || hay.len() < pat.len() {
        return None;
    }
    (0..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

fn strip_word_prefix<'t>(text: &'t str, prefixes: &[&str]) -> Option<&'t str> {
    prefixes.iter().find_map(|p| {
        let head = text.get(..p.len())?;
        let rest = &text[p.len()..];
        let boundary = rest.chars().next().map_or(true, |c| c.is_whitespace() || c == ',');
        (head.eq_ignore_ascii_case(p) && boundary)
            .then(|| rest.trim_start_matches([',', ' ', '\t', '\n']))
    })
}

/// Drop a first-person hedge ("I think you want to ...") so the marker reads
/// as a statement
fn strip_preamble(text: &str) -> &str {
    let Some(mut rest) = strip_word_prefix(text, OPENERS) else {
        return text;
    };
    while let Some(next) = strip_word_prefix(rest, PURPOSE_LEADS) {
        rest = next;
    }
    rest
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Force the closing discovery turn into shape: it opens with the purpose
/// marker and contains no trailing question.
pub fn enforce_completion(text: &str) -> String {
    let text = text.trim();
    let mut out = match find_ascii_ci(text, WHY_MARKER) {
        Some(pos) => format!("{}{}", WHY_MARKER, &text[pos + WHY_MARKER.len()..]),
        None if text.is_empty() => String::new(),
        None => format!("{} {}", WHY_MARKER, lower_first(strip_preamble(text))),
    };

    loop {
        let kept = out.trim_end().len();
        out.truncate(kept);
        if !out.ends_with('?') {
            break;
        }
        let body_len = out.trim_end_matches('?').len();
        match out[..body_len].rfind(['.', '!', '\n']) {
            Some(end) if end >= WHY_MARKER.len() => out.truncate(end + 1),
            _ => {
                let statement = out[..body_len].trim_end().len();
                out.truncate(statement);
                out.push('.');
            }
        }
    }

    if out.trim_end_matches(['.', ' ']).len() <= WHY_MARKER.len() {
        return format!("{} {}", WHY_MARKER, MISSING_STATEMENT);
    }
    out
}
