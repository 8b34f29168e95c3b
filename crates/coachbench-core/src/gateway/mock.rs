//! Deterministic offline gateway
//!
//! Replies are chosen from the call purpose, so a whole batch can run
//! without network access. Tests inject failures or odd replies through
//! [`MockGateway::with_override`] and inspect [`MockGateway::calls`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::{CallPurpose, CallRequest, Completion, GatewayError, ModelGateway};
use crate::model::{ModelDescriptor, ModelRole};
use crate::profile::BucketKind;
use crate::usage::TokenUsage;

type Override = dyn Fn(&CallRequest<'_>) -> Option<Result<String, GatewayError>> + Send + Sync;

/// A call seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub role: ModelRole,
    pub model: String,
    pub purpose: CallPurpose,
    pub temperature: f32,
}

const PERSONA_ANSWERS: &[&str] = &[
    "I spend most weekends cooking for neighbours and it never feels like work.",
    "Honestly I lose track of time when I am sketching floor plans.",
    "My old manager said I explain messy problems so anyone can follow them.",
    "There was a winter I organised meals for a family after their house fire.",
    "Money matters to me because I still support my younger brother.",
    "I get restless in meetings that end without a clear decision.",
    "Teaching my niece fractions with recipes was the best afternoon in months.",
    "People keep asking me to help them plan renovations on a tight budget.",
];

const PERSONA_DECISION_ANSWERS: &[&str] = &[
    "I am weighing a part-time design course against staying in my current job.",
    "The course costs about four months of savings and runs on weekday evenings.",
    "My partner supports it but I worry about being tired all the time.",
];

pub struct MockGateway {
    override_fn: Option<Box<Override>>,
    calls: Mutex<Vec<RecordedCall>>,
    persona_turns: AtomicUsize,
    missing_credentials: Vec<ModelRole>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            override_fn: None,
            calls: Mutex::new(Vec::new()),
            persona_turns: AtomicUsize::new(0),
            missing_credentials: Vec::new(),
        }
    }

    /// Replace selected replies. Returning `None` keeps the default reply.
    pub fn with_override<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallRequest<'_>) -> Option<Result<String, GatewayError>> + Send + Sync + 'static,
    {
        self.override_fn = Some(Box::new(f));
        self
    }

    /// Make the credential preflight fail for a role
    pub fn without_credential(mut self, role: ModelRole) -> Self {
        self.missing_credentials.push(role);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, pred: impl Fn(&RecordedCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn default_reply(&self, request: &CallRequest<'_>) -> String {
        match request.purpose {
            CallPurpose::Persona => self.persona_reply(request),
            CallPurpose::DiscoveryTurn { exchange } => format!(
                "Thank you for sharing that. Exchange {} question: when did you last feel fully absorbed?",
                exchange
            ),
            CallPurpose::DiscoveryCompletion => {
                "Your Why is to turn everyday care into practical plans so that the people around you feel capable and supported."
                    .to_string()
            }
            CallPurpose::Extraction => json!({
                "summary": "Practical helper who shows care through food and planning.",
                "patterns": ["feeding people", "making complex things simple"],
                "why_statement": "Your Why is to turn everyday care into practical plans so that the people around you feel capable and supported.",
                "why_explanation": "Stories repeatedly centre on cooking and planning for others.",
                "loves": ["Cooking for others", "Sketching floor plans", "Teaching through recipes"],
                "good_at": ["Explaining messy problems", "Budget planning", "Organising community help"]
            })
            .to_string(),
            CallPurpose::BucketTurn { bucket } => format!(
                "Let us build out {}. What comes to mind first?",
                bucket.topic()
            ),
            CallPurpose::BucketSummary(kind) => bucket_summary(kind),
            CallPurpose::Overlap => json!({
                "passion": {"bullets": ["Teaching cooking"], "summary": "Sharing food skills"},
                "mission": {"bullets": ["Community meals"], "summary": "Feeding neighbours in need"},
                "profession": {"bullets": ["Renovation planning"], "summary": "Budget design help"},
                "vocation": {"bullets": ["Affordable housing advice"], "summary": "Paid planning for families"}
            })
            .to_string(),
            CallPurpose::DecisionTurn { exchange } => format!(
                "Given your buckets, option {} looks strongest because it keeps your savings intact.",
                exchange
            ),
            CallPurpose::Judge => judge_reply(),
        }
    }

    fn persona_reply(&self, request: &CallRequest<'_>) -> String {
        let n = self.persona_turns.fetch_add(1, Ordering::SeqCst);
        let in_decision = request
            .messages
            .first()
            .map(|m| m.content.contains("DECISION"))
            .unwrap_or(false);
        if in_decision {
            PERSONA_DECISION_ANSWERS[n % PERSONA_DECISION_ANSWERS.len()].to_string()
        } else {
            PERSONA_ANSWERS[n % PERSONA_ANSWERS.len()].to_string()
        }
    }
}

fn bucket_summary(kind: BucketKind) -> String {
    let value = match kind {
        BucketKind::Love => json!({
            "loves": ["Cooking for others", "Sketching floor plans", "Teaching through recipes"],
            "summary": "Hands-on care"
        }),
        BucketKind::GoodAt => json!({
            "skills": [
                {"skill": "Explaining messy problems", "evidence": "manager feedback"},
                {"skill": "Budget planning", "evidence": "renovation help"},
                {"skill": "Organising community help", "evidence": "meal rota"}
            ],
            "summary": "Practical organiser"
        }),
        BucketKind::WorldNeeds => json!({
            "causes": ["Food security", "Affordable housing"],
            "problems": ["Families overwhelmed after crises"],
            "summary": "Stability for families"
        }),
        BucketKind::PaidFor => json!({
            "offers": [
                {"offer": "Renovation budget plans", "audience": "first-time homeowners"},
                {"offer": "Cooking workshops", "audience": "community centres"},
                {"offer": "Meal planning", "audience": "busy parents"}
            ],
            "market_summary": "Local practical services"
        }),
    };
    value.to_string()
}

fn judge_reply() -> String {
    let metric = |score: f64, note: &str| {
        json!({"score": score, "justification": note, "evidence": ["USER: I spend most weekends cooking"]})
    };
    json!({
        "atomic_claims": {"user_stated": 10, "captured": 8, "unsupported": 1},
        "metrics": {
            "clarity": metric(8.0, "Questions were clear"),
            "structural_correctness": metric(9.0, "Followed the phase order"),
            "consistency": metric(7.0, "Minor drift in the decision phase"),
            "coverage": metric(8.0, "Most stated items captured"),
            "hallucination": metric(9.0, "One unsupported claim"),
            "decision_expertise": metric(6.5, "Reasonable but generic advice"),
            "safety": metric(10.0, "No concerns")
        },
        "general_comments": ["Solid session overall"],
        "pros": ["Warm tone", "Clear purpose statement"],
        "cons": ["Generic decision advice"],
        "issues": [{
            "location": "Decision #2",
            "quote": "option 2 looks strongest",
            "severity": "minor",
            "fix": "Tie the recommendation to stated values"
        }]
    })
    .to_string()
}

fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

#[async_trait]
impl ModelGateway for MockGateway {
    async fn call(&self, request: &CallRequest<'_>) -> Result<Completion, GatewayError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                role: request.role,
                model: request.model.id.clone(),
                purpose: request.purpose,
                temperature: request.params.temperature,
            });
        }

        let reply = match self.override_fn.as_ref().and_then(|f| f(request)) {
            Some(reply) => reply?,
            None => self.default_reply(request),
        };
        if reply.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }

        let input = request.messages.iter().map(|m| word_count(&m.content)).sum();
        Ok(Completion {
            usage: TokenUsage::new(input, word_count(&reply)),
            text: reply,
        })
    }

    fn ensure_ready(&self, role: ModelRole, _model: &ModelDescriptor) -> Result<(), GatewayError> {
        if self.missing_credentials.contains(&role) {
            return Err(GatewayError::MissingCredential { role });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
