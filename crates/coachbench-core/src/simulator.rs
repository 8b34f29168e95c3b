//! Synthetic respondent
//!
//! Generates the persona's next turn and screens it before it reaches the
//! transcript. A screened turn is replaced with a neutral deflection so the
//! persona never drifts into echoing or imitating the coach under test.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gateway::{
    CallParams, CallPurpose, CallRequest, ChatMessage, GatewayError, ModelGateway,
};
use crate::model::{ModelDescriptor, ModelRole};
use crate::prompts::persona_system;
use crate::scenario::Scenario;
use crate::text::word_tokens;
use crate::transcript::{MessageRole, TranscriptMessage};
use crate::usage::TokenUsage;

/// Phrases that belong to the coach, not the client
pub const COACHING_PHRASES: &[&str] = &[
    "your statement is",
    "does this resonate",
    "does that resonate",
    "how does that feel",
    "i hear you saying",
    "what i'm hearing",
    "your why is",
    "let's explore",
    "as your coach",
    "would you like to",
];

/// Tokens inspected from the start of a reply
pub const MIRROR_WINDOW: usize = 30;
/// Tokens this short are ignored by the mirroring check
pub const MIRROR_MIN_TOKEN_LEN: usize = 5;
/// Shared long tokens at which a reply counts as mirroring
pub const MIRROR_THRESHOLD: usize = 12;

/// Prior messages sent along with each persona request
const HISTORY_WINDOW: usize = 16;

const DEFLECTIONS: &[&str] = &[
    "Sorry, I lost my train of thought there. This part of my life just feels unsettled right now.",
    "I'm not sure how to put it. What I know is that I want my days to feel more like mine.",
    "That's a lot to take in. Honestly I keep coming back to how tired I've been lately.",
    "I don't really have words for that yet. It's something I keep turning over.",
    "Hmm. I'd rather just tell you that work has felt heavy and I want that to change.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Safeguard {
    /// Reply opens with `.`, `?` or `!`, a truncated copy of the prior turn
    DanglingPunctuation,
    /// Reply uses coaching-register language
    CoachingPhrase,
    /// Reply repeats the coach's wording
    Mirroring,
    /// Model produced nothing
    EmptyOutput,
}

/// How often each safeguard fired during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeguardCounts {
    #[serde(default)]
    pub dangling_punctuation: u32,
    #[serde(default)]
    pub coaching_phrase: u32,
    #[serde(default)]
    pub mirroring: u32,
    #[serde(default)]
    pub empty_output: u32,
}

impl SafeguardCounts {
    pub fn record(&mut self, safeguard: Safeguard) {
        match safeguard {
            Safeguard::DanglingPunctuation => self.dangling_punctuation += 1,
            Safeguard::CoachingPhrase => self.coaching_phrase += 1,
            Safeguard::Mirroring => self.mirroring += 1,
            Safeguard::EmptyOutput => self.empty_output += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.dangling_punctuation + self.coaching_phrase + self.mirroring + self.empty_output
    }
}

/// Run the safeguards in order against a raw persona reply
pub fn screen(reply: &str, previous_coach_turn: Option<&str>) -> Option<Safeguard> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Some(Safeguard::EmptyOutput);
    }
    if trimmed.starts_with(['.', '?', '!']) {
        return Some(Safeguard::DanglingPunctuation);
    }
    let lowered = trimmed.to_lowercase().replace('\u{2019}', "'");
    if COACHING_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(Safeguard::CoachingPhrase);
    }
    if let Some(previous) = previous_coach_turn {
        if mirrored_tokens(trimmed, previous) >= MIRROR_THRESHOLD {
            return Some(Safeguard::Mirroring);
        }
    }
    None
}

/// Distinct long tokens from the opening of `reply` that also occur in `previous`
pub fn mirrored_tokens(reply: &str, previous: &str) -> usize {
    let previous: HashSet<String> = word_tokens(previous)
        .filter(|t| t.chars().count() > MIRROR_MIN_TOKEN_LEN)
        .collect();
    word_tokens(reply)
        .take(MIRROR_WINDOW)
        .filter(|t| t.chars().count() > MIRROR_MIN_TOKEN_LEN)
        .filter(|t| previous.contains(t))
        .collect::<HashSet<_>>()
        .len()
}

/// One persona turn after screening
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaTurn {
    pub text: String,
    pub usage: TokenUsage,
    pub safeguard: Option<Safeguard>,
}

pub struct PersonaSimulator<'a> {
    gateway: &'a dyn ModelGateway,
    model: &'a ModelDescriptor,
    scenario: &'a Scenario,
    params: CallParams,
    deflections_used: usize,
    counts: SafeguardCounts,
}

impl<'a> PersonaSimulator<'a> {
    /// `params.temperature` should be the judge temperature so personas replay
    /// deterministically
    pub fn new(
        gateway: &'a dyn ModelGateway,
        model: &'a ModelDescriptor,
        scenario: &'a Scenario,
        params: CallParams,
    ) -> Self {
        Self {
            gateway,
            model,
            scenario,
            params,
            deflections_used: 0,
            counts: SafeguardCounts::default(),
        }
    }

    pub fn counts(&self) -> SafeguardCounts {
        self.counts
    }

    fn next_deflection(&mut self) -> String {
        let line = DEFLECTIONS[self.deflections_used % DEFLECTIONS.len()];
        self.deflections_used += 1;
        line.to_string()
    }

    /// Produce the persona's next turn given the dialogue so far.
    ///
    /// Roles are swapped for the persona model: the coach's turns become
    /// `user` messages and the persona's own turns `assistant` messages.
    pub async fn next_turn(
        &mut self,
        history: &[TranscriptMessage],
        focus: &str,
    ) -> Result<PersonaTurn, GatewayError> {
        let mut messages = vec![ChatMessage::system(persona_system(self.scenario, focus))];
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        for message in &history[start..] {
            messages.push(match message.role {
                MessageRole::Assistant => ChatMessage::user(message.content.clone()),
                MessageRole::User => ChatMessage::assistant(message.content.clone()),
            });
        }
        if history.is_empty() {
            messages.push(ChatMessage::user("Hello, what brings you here today?"));
        }

        let previous_coach_turn = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str());

        let request = CallRequest {
            role: ModelRole::SyntheticUser,
            model: self.model,
            messages: &messages,
            params: self.params,
            purpose: CallPurpose::Persona,
        };
        let (raw, usage) = match self.gateway.call(&request).await {
            Ok(completion) => (completion.text, completion.usage),
            Err(GatewayError::EmptyResponse) => (String::new(), TokenUsage::default()),
            Err(err) => return Err(err),
        };

        match screen(&raw, previous_coach_turn) {
            Some(safeguard) => {
                self.counts.record(safeguard);
                warn!(
                    scenario = %self.scenario.id,
                    safeguard = ?safeguard,
                    "persona reply replaced with deflection"
                );
                Ok(PersonaTurn {
                    text: self.next_deflection(),
                    usage,
                    safeguard: Some(safeguard),
                })
            }
            None => {
                debug!(scenario = %self.scenario.id, chars = raw.len(), "persona turn");
                Ok(PersonaTurn {
                    text: raw.trim().to_string(),
                    usage,
                    safeguard: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::transcript::{DiscoveryStage, PhaseTag, Transcript};

    fn scenario() -> Scenario {
        Scenario {
            id: "night-nurse".into(),
            name: "Night nurse".into(),
            persona: "Priya, ICU nurse".into(),
            constraints: vec![],
            goals: vec![],
            conflicts: vec![],
            red_lines: vec![],
            starter_context: String::new(),
            decision: None,
        }
    }

    fn params() -> CallParams {
        CallParams {
            temperature: 0.0,
            max_tokens: 200,
        }
    }

    #[test]
    fn test_dangling_punctuation() {
        assert_eq!(
            screen(". And that is why I stayed.", None),
            Some(Safeguard::DanglingPunctuation)
        );
        assert_eq!(screen("  ? what", None), Some(Safeguard::DanglingPunctuation));
        assert_eq!(screen("I stayed.", None), None);
    }

    #[test]
    fn test_coaching_phrases_case_insensitive() {
        assert_eq!(
            screen("So YOUR STATEMENT IS about care.", None),
            Some(Safeguard::CoachingPhrase)
        );
        assert_eq!(
            screen("Does that resonate with you?", None),
            Some(Safeguard::CoachingPhrase)
        );
        assert_eq!(
            screen("What I\u{2019}m hearing is fear.", None),
            Some(Safeguard::CoachingPhrase)
        );
    }

    #[test]
    fn test_mirroring_threshold() {
        let coach = "You described feeling energized whenever families trusted your practical \
                     judgement during stressful hospital transitions, especially overnight shifts \
                     involving complicated medication schedules and anxious relatives needing \
                     reassurance constantly.";
        // twelve shared long tokens inside the first thirty
        let echo = "Feeling energized whenever families trusted practical judgement during \
                    stressful hospital transitions, overnight shifts, complicated medication \
                    schedules.";
        assert!(mirrored_tokens(echo, coach) >= MIRROR_THRESHOLD);
        assert_eq!(screen(echo, Some(coach)), Some(Safeguard::Mirroring));

        let own_words = "Mostly I remember one night with a frightened teenager and her mother.";
        assert!(mirrored_tokens(own_words, coach) < MIRROR_THRESHOLD);
        assert_eq!(screen(own_words, Some(coach)), None);
    }

    #[test]
    fn test_short_tokens_do_not_count_as_mirroring() {
        let coach = "what when where which would could should there these those their about";
        let reply = "what when where which would could should there these those their about";
        assert_eq!(mirrored_tokens(reply, coach), 1);
    }

    #[tokio::test]
    async fn test_next_turn_deflects_and_counts() {
        let gateway = MockGateway::new().with_override(|_| Some(Ok(". copied tail".to_string())));
        let model = ModelDescriptor::new("mock", "persona");
        let scenario = scenario();
        let mut sim = PersonaSimulator::new(&gateway, &model, &scenario, params());

        let first = sim.next_turn(&[], "intro").await.unwrap();
        let second = sim.next_turn(&[], "intro").await.unwrap();
        assert_eq!(first.safeguard, Some(Safeguard::DanglingPunctuation));
        assert_ne!(first.text, ". copied tail");
        assert_ne!(first.text, second.text);
        assert!(!first.text.contains('?'));
        assert_eq!(sim.counts().dangling_punctuation, 2);
    }

    #[tokio::test]
    async fn test_empty_reply_is_deflected_not_failed() {
        let gateway =
            MockGateway::new().with_override(|_| Some(Err(GatewayError::EmptyResponse)));
        let model = ModelDescriptor::new("mock", "persona");
        let scenario = scenario();
        let mut sim = PersonaSimulator::new(&gateway, &model, &scenario, params());
        let turn = sim.next_turn(&[], "intro").await.unwrap();
        assert_eq!(turn.safeguard, Some(Safeguard::EmptyOutput));
        assert_eq!(sim.counts().total(), 1);
    }

    #[tokio::test]
    async fn test_roles_swapped_and_temperature_passed() {
        let gateway = MockGateway::new().with_override(|request| {
            let roles: Vec<_> = request.messages.iter().map(|m| m.role).collect();
            assert_eq!(
                roles,
                vec![
                    crate::gateway::ChatRole::System,
                    crate::gateway::ChatRole::Assistant,
                    crate::gateway::ChatRole::User
                ]
            );
            None
        });
        let model = ModelDescriptor::new("mock", "persona");
        let scenario = scenario();
        let mut transcript = Transcript::new();
        let tag = PhaseTag::Discovery(DiscoveryStage::Intro);
        transcript
            .push(MessageRole::User, "I feel stuck.", tag, Some(1))
            .unwrap();
        transcript
            .push(MessageRole::Assistant, "Tell me about a recent good day.", tag, Some(1))
            .unwrap();

        let mut sim = PersonaSimulator::new(&gateway, &model, &scenario, params());
        let turn = sim.next_turn(transcript.messages(), "intro").await.unwrap();
        assert_eq!(turn.safeguard, None);
        let calls = gateway.calls();
        assert_eq!(calls[0].role, ModelRole::SyntheticUser);
        assert_eq!(calls[0].temperature, 0.0);
    }
}
