//! Phase orchestrator
//!
//! Drives one (candidate, scenario) pair through the three-phase protocol:
//! twelve discovery exchanges, the four-bucket build and a three-exchange
//! decision consultation. The result is always a terminal [`Run`]; any error
//! along the way fails the run and keeps what was accumulated.

mod buckets;
mod decision;
mod discovery;
mod extraction;

pub use extraction::enforce_completion;

use std::time::Instant;

use tracing::{info, warn};

use crate::config::EvalConfig;
use crate::control::BatchControl;
use crate::debug_time;
use crate::error::{EvalError, Result};
use crate::gateway::{
    CallParams, CallPurpose, CallRequest, ChatMessage, GatewayError, ModelGateway,
};
use crate::model::{ModelDescriptor, ModelRole};
use crate::progress::PhaseProgress;
use crate::run::Run;
use crate::scenario::Scenario;
use crate::simulator::{PersonaSimulator, PersonaTurn};
use crate::transcript::{MessageRole, TranscriptMessage};
use crate::usage::EvalPhase;

/// Number of exchanges in the decision consultation
pub const DECISION_EXCHANGES: u32 = 3;

/// Everything one run needs, borrowed from the coordinator
pub struct RunContext<'a> {
    pub gateway: &'a dyn ModelGateway,
    pub candidate: &'a ModelDescriptor,
    pub synthetic_user: &'a ModelDescriptor,
    pub judge: &'a ModelDescriptor,
    pub scenario: &'a Scenario,
    pub config: &'a EvalConfig,
    pub control: &'a BatchControl,
}

pub type PhaseProgressFn<'a> = dyn FnMut(PhaseProgress) + Send + 'a;

/// Run the full protocol for one pair. Never panics on model misbehavior and
/// never returns a non-terminal run.
pub async fn run_evaluation(ctx: &RunContext<'_>, on_progress: &mut PhaseProgressFn<'_>) -> Run {
    let run = Run::new(ctx.candidate, ctx.synthetic_user, ctx.judge, ctx.scenario);
    info!(
        run = %run.id,
        model = %ctx.candidate,
        scenario = %ctx.scenario.id,
        "run started"
    );

    let persona = PersonaSimulator::new(
        ctx.gateway,
        ctx.synthetic_user,
        ctx.scenario,
        CallParams {
            temperature: ctx.config.judge_temperature,
            max_tokens: ctx.config.max_tokens.persona_turn,
        },
    );
    let mut session = Session {
        ctx,
        run,
        persona,
        on_progress,
    };

    let outcome = session.drive().await;
    let counts = session.persona.counts();
    let mut run = session.run;
    run.safeguards = counts;

    let transition = match outcome {
        Ok(()) => run.complete(),
        Err(err) => {
            if err.is_cancellation() {
                info!(run = %run.id, "run cancelled");
            } else {
                warn!(run = %run.id, error = %err, "run failed");
            }
            run.fail(err.to_string())
        }
    };
    if let Err(err) = transition {
        warn!(run = %run.id, error = %err, "run already terminal");
    }
    run
}

pub(crate) struct Session<'c, 'a> {
    ctx: &'c RunContext<'a>,
    run: Run,
    persona: PersonaSimulator<'a>,
    on_progress: &'c mut PhaseProgressFn<'c>,
}

impl<'c, 'a> Session<'c, 'a> {
    async fn drive(&mut self) -> Result<()> {
        let start = Instant::now();
        self.discovery().await?;
        debug_time!(start, "discovery finished", run = self.run.id.as_str());

        let start = Instant::now();
        self.build_buckets().await?;
        debug_time!(start, "bucket build finished", run = self.run.id.as_str());

        let start = Instant::now();
        self.decision().await?;
        debug_time!(start, "decision finished", run = self.run.id.as_str());

        // an abort that arrived during the last call still counts
        self.ctx.control.checkpoint().await
    }

    fn progress(&mut self, update: PhaseProgress) {
        (self.on_progress)(update);
    }

    fn candidate_params(&self) -> CallParams {
        CallParams {
            temperature: self.ctx.config.candidate_temperature,
            max_tokens: self.ctx.config.max_tokens.coach_turn,
        }
    }

    /// Call the candidate as the coach.
    ///
    /// An empty reply is kept as an empty turn so the dialogue continues; any
    /// other gateway failure fails the run.
    async fn coach_turn<'m, I>(
        &mut self,
        phase: EvalPhase,
        system: String,
        history: I,
        purpose: CallPurpose,
    ) -> Result<String>
    where
        I: IntoIterator<Item = &'m TranscriptMessage>,
    {
        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(history.into_iter().map(|m| match m.role {
            MessageRole::User => ChatMessage::user(m.content.clone()),
            MessageRole::Assistant => ChatMessage::assistant(m.content.clone()),
        }));
        if messages.len() == 1 {
            messages.push(ChatMessage::user("Please begin."));
        }

        let request = CallRequest {
            role: ModelRole::Candidate,
            model: self.ctx.candidate,
            messages: &messages,
            params: self.candidate_params(),
            purpose,
        };
        match self.ctx.gateway.call(&request).await {
            Ok(completion) => {
                self.run
                    .record_usage(phase, ModelRole::Candidate, completion.usage)?;
                Ok(completion.text.trim().to_string())
            }
            Err(GatewayError::EmptyResponse) => {
                warn!(
                    run = %self.run.id,
                    purpose = %purpose,
                    "candidate returned an empty response; continuing"
                );
                Ok(String::new())
            }
            Err(err) => Err(EvalError::Gateway(err)),
        }
    }

    /// Next synthetic-user turn given `history`
    async fn persona_turn(
        &mut self,
        phase: EvalPhase,
        history: &[TranscriptMessage],
        focus: &str,
    ) -> Result<PersonaTurn> {
        let turn = self.persona.next_turn(history, focus).await?;
        self.run
            .record_usage(phase, ModelRole::SyntheticUser, turn.usage)?;
        Ok(turn)
    }
}

#[cfg(test)]
mod tests;
