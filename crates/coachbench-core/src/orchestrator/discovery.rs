use tracing::info;

use super::{enforce_completion, Session};
use crate::error::Result;
use crate::gateway::CallPurpose;
use crate::profile::{normalize_discovery, DiscoveryProfile};
use crate::progress::PhaseProgress;
use crate::prompts::{
    discovery_completion_system, discovery_focus, discovery_system, extraction_messages,
};
use crate::transcript::{
    render_labeled, DiscoveryStage, MessageRole, PhaseTag, DISCOVERY_EXCHANGES,
};
use crate::usage::EvalPhase;

impl<'c, 'a> Session<'c, 'a> {
    /// Twelve exchanges, user first, then the extraction pass
    pub(super) async fn discovery(&mut self) -> Result<()> {
        self.progress(PhaseProgress::phase(EvalPhase::Discovery));

        for exchange in 1..=DISCOVERY_EXCHANGES {
            self.ctx.control.checkpoint().await?;
            self.progress(PhaseProgress::exchange(
                EvalPhase::Discovery,
                exchange,
                Some(DISCOVERY_EXCHANGES),
            ));

            let stage = DiscoveryStage::for_exchange(exchange);
            let tag = PhaseTag::Discovery(stage);

            let starter = self.ctx.scenario.starter_context.trim();
            let user_text = if exchange == 1 && !starter.is_empty() {
                starter.to_string()
            } else {
                let history = self.run.transcript.messages().to_vec();
                self.persona_turn(EvalPhase::Discovery, &history, discovery_focus(stage))
                    .await?
                    .text
            };
            self.run
                .transcript
                .push(MessageRole::User, user_text, tag, Some(exchange))?;

            let notes: Vec<String> = self
                .run
                .transcript
                .discovery()
                .filter(|m| m.role == MessageRole::User)
                .map(|m| m.content.clone())
                .collect();
            let history = self.run.transcript.messages().to_vec();

            let reply = if exchange == DISCOVERY_EXCHANGES {
                let raw = self
                    .coach_turn(
                        EvalPhase::Discovery,
                        discovery_completion_system(&notes),
                        &history,
                        CallPurpose::DiscoveryCompletion,
                    )
                    .await?;
                enforce_completion(&raw)
            } else {
                self.coach_turn(
                    EvalPhase::Discovery,
                    discovery_system(stage, exchange, DISCOVERY_EXCHANGES, &notes),
                    &history,
                    CallPurpose::DiscoveryTurn { exchange },
                )
                .await?
            };
            self.run
                .transcript
                .push(MessageRole::Assistant, reply, tag, Some(exchange))?;
        }

        self.ctx.control.checkpoint().await?;
        let rendered = render_labeled(self.run.transcript.discovery());
        let profile = match self
            .structured_pass(
                EvalPhase::Discovery,
                extraction_messages(&rendered),
                CallPurpose::Extraction,
            )
            .await?
        {
            Some(value) => normalize_discovery(&value),
            None => DiscoveryProfile::default(),
        };
        info!(
            run = %self.run.id,
            loves = profile.loves.len(),
            good_at = profile.good_at.len(),
            "discovery profile extracted"
        );
        self.run.discovery_profile = profile;
        Ok(())
    }
}
