use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::profile::BucketKind;

/// Number of exchanges in the discovery phase
pub const DISCOVERY_EXCHANGES: u32 = 12;

/// Speaker of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::User => "USER",
            MessageRole::Assistant => "COACH",
        }
    }
}

/// Discovery sub-phase, derived from the exchange index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStage {
    Intro,
    EnergyMap,
    Stories,
    YourWhy,
}

impl DiscoveryStage {
    /// Exchanges 1-3 intro, 4-6 energy map, 7-9 stories, 10-12 your why
    pub fn for_exchange(exchange: u32) -> Self {
        match exchange {
            0..=3 => DiscoveryStage::Intro,
            4..=6 => DiscoveryStage::EnergyMap,
            7..=9 => DiscoveryStage::Stories,
            _ => DiscoveryStage::YourWhy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryStage::Intro => "intro",
            DiscoveryStage::EnergyMap => "energy_map",
            DiscoveryStage::Stories => "stories",
            DiscoveryStage::YourWhy => "your_why",
        }
    }
}

/// Which part of the protocol a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", content = "stage", rename_all = "snake_case")]
pub enum PhaseTag {
    Discovery(DiscoveryStage),
    Bucket(BucketKind),
    Decision,
}

impl PhaseTag {
    pub fn is_discovery(&self) -> bool {
        matches!(self, PhaseTag::Discovery(_))
    }

    pub fn label(&self) -> String {
        match self {
            PhaseTag::Discovery(stage) => format!("Discovery/{}", stage.as_str()),
            PhaseTag::Bucket(kind) => format!("Bucket/{}", kind.as_str()),
            PhaseTag::Decision => "Decision".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub phase: PhaseTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<u32>,
}

/// Append-only ordered list of messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<TranscriptMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current time.
    ///
    /// The timestamp is nudged forward when the clock has not advanced past the
    /// previous message. Discovery messages must carry an exchange index in
    /// `1..=12` greater than the last discovery message from the same speaker.
    pub fn push(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        phase: PhaseTag,
        exchange: Option<u32>,
    ) -> Result<&TranscriptMessage> {
        if phase.is_discovery() {
            let index = exchange.ok_or_else(|| {
                EvalError::invalid_value("discovery message", "missing exchange index")
            })?;
            if !(1..=DISCOVERY_EXCHANGES).contains(&index) {
                return Err(EvalError::invalid_value("discovery exchange index", index));
            }
            let last = self
                .messages
                .iter()
                .rev()
                .find(|m| m.role == role && m.phase.is_discovery())
                .and_then(|m| m.exchange);
            if last.is_some_and(|last| index <= last) {
                return Err(EvalError::invalid_value(
                    "discovery exchange index",
                    format!("{} after {}", index, last.unwrap_or_default()),
                ));
            }
        }

        let mut timestamp = Utc::now();
        if let Some(prev) = self.messages.last() {
            if timestamp <= prev.timestamp {
                timestamp = prev.timestamp + Duration::milliseconds(1);
            }
        }

        let index = self.messages.len();
        self.messages.push(TranscriptMessage {
            role,
            content: content.into(),
            timestamp,
            phase,
            exchange,
        });
        Ok(&self.messages[index])
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_assistant(&self) -> Option<&TranscriptMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }

    /// Messages of the discovery phase only
    pub fn discovery(&self) -> impl Iterator<Item = &TranscriptMessage> {
        self.messages.iter().filter(|m| m.phase.is_discovery())
    }

    /// Messages carrying exactly this phase tag
    pub fn in_phase(&self, phase: PhaseTag) -> impl Iterator<Item = &TranscriptMessage> {
        self.messages.iter().filter(move |m| m.phase == phase)
    }
}
