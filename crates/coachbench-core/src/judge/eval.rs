//! Judge execution
//!
//! Builds the judge prompt for one run, calls the judge model once and parses
//! the reply into a [`JudgeReport`].

use serde_json::json;
use tracing::{debug, info};

use super::parse::parse_report;
use super::rubric::Rubric;
use super::types::JudgeReport;
use crate::error::Result;
use crate::gateway::{CallParams, CallPurpose, CallRequest, ChatMessage, GatewayError, ModelGateway};
use crate::model::{ModelDescriptor, ModelRole};
use crate::run::Run;
use crate::transcript::render_labeled;
use crate::usage::TokenUsage;

const SYSTEM_PROMPT: &str = "You are a strict, evidence-driven evaluator of coaching conversations. \
Score only what the transcript shows. Every deduction needs a verbatim quote. Return JSON only.";

/// A judge call's outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    pub report: JudgeReport,
    pub usage: TokenUsage,
}

pub struct JudgeEngine<'a> {
    gateway: &'a dyn ModelGateway,
    model: &'a ModelDescriptor,
    params: CallParams,
    rubric: Rubric,
}

impl<'a> JudgeEngine<'a> {
    pub fn new(
        gateway: &'a dyn ModelGateway,
        model: &'a ModelDescriptor,
        params: CallParams,
    ) -> Result<Self> {
        Self::with_rubric(gateway, model, params, Rubric::standard())
    }

    pub fn with_rubric(
        gateway: &'a dyn ModelGateway,
        model: &'a ModelDescriptor,
        params: CallParams,
        rubric: Rubric,
    ) -> Result<Self> {
        rubric.validate()?;
        Ok(Self {
            gateway,
            model,
            params,
            rubric,
        })
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Score a run. Only gateway failures are errors; unparseable output
    /// becomes an all-zero report.
    pub async fn judge_run(&self, run: &Run) -> std::result::Result<Judgement, GatewayError> {
        let messages = build_judge_prompt(run, &self.rubric);
        let request = CallRequest {
            role: ModelRole::Judge,
            model: self.model,
            messages: &messages,
            params: self.params,
            purpose: CallPurpose::Judge,
        };
        let completion = self.gateway.call(&request).await?;
        debug!(run = %run.id, chars = completion.text.len(), "judge reply received");

        let report = parse_report(&completion.text, &self.rubric);
        info!(
            run = %run.id,
            model = %run.candidate.id,
            scenario = %run.scenario_id,
            overall = report.overall_score,
            parse_failed = report.parse_failed,
            "run judged"
        );
        Ok(Judgement {
            report,
            usage: completion.usage,
        })
    }
}

/// Judge prompt: rubric, scenario identity, both profiles as JSON and the
/// labeled transcript
pub fn build_judge_prompt(run: &Run, rubric: &Rubric) -> Vec<ChatMessage> {
    let profiles = json!({
        "discovery_profile": run.discovery_profile,
        "bucket_profile": run.bucket_profile,
    });
    let profiles = serde_json::to_string_pretty(&profiles).unwrap_or_else(|_| profiles.to_string());

    let transcript = render_labeled(
        run.transcript
            .messages()
            .iter()
            .chain(run.decision_messages.messages()),
    );

    let user = format!(
        r#"Evaluate the coaching session below.

# Scenario
id: {scenario_id}
name: {scenario_name}

# Rubric
{rubric}
# Extracted Profiles (JSON)
{profiles}

# Transcript
{transcript}

# Required Response Format
Return JSON with this exact structure:
{{
  "atomic_claims": {{"user_stated": <int>, "captured": <int>, "unsupported": <int>}},
  "metrics": {{
    "<metric>": {{"score": <0-10>, "justification": "...", "evidence": ["quote", ...]}},
    ...one entry for each of: clarity, structural_correctness, consistency, coverage, hallucination, decision_expertise, safety
  }},
  "general_comments": ["..."],
  "pros": ["..."],
  "cons": ["..."],
  "issues": [{{"location": "[Phase #n]", "quote": "...", "severity": "minor|major|critical", "fix": "..."}}]
}}

Provide JSON only, no additional text."#,
        scenario_id = run.scenario_id,
        scenario_name = run.scenario_name,
        rubric = rubric.render(),
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
