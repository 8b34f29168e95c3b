use super::{Session, DECISION_EXCHANGES};
use crate::error::Result;
use crate::gateway::CallPurpose;
use crate::progress::PhaseProgress;
use crate::prompts::{decision_focus, decision_system};
use crate::transcript::{MessageRole, PhaseTag};
use crate::usage::EvalPhase;

impl<'c, 'a> Session<'c, 'a> {
    /// Three exchanges on the scenario's decision, kept apart from the
    /// discovery transcript
    pub(super) async fn decision(&mut self) -> Result<()> {
        self.progress(PhaseProgress::phase(EvalPhase::Decision));
        let question = self.ctx.scenario.decision_question().to_string();
        let focus = decision_focus(&question);

        for exchange in 1..=DECISION_EXCHANGES {
            self.ctx.control.checkpoint().await?;
            self.progress(PhaseProgress::exchange(
                EvalPhase::Decision,
                exchange,
                Some(DECISION_EXCHANGES),
            ));

            let user_text = if exchange == 1 {
                question.clone()
            } else {
                let history = self.run.decision_messages.messages().to_vec();
                self.persona_turn(EvalPhase::Decision, &history, &focus)
                    .await?
                    .text
            };
            self.run.decision_messages.push(
                MessageRole::User,
                user_text,
                PhaseTag::Decision,
                Some(exchange),
            )?;

            let system = decision_system(&self.run.bucket_profile, &self.run.discovery_profile);
            let history = self.run.decision_messages.messages().to_vec();
            let reply = self
                .coach_turn(
                    EvalPhase::Decision,
                    system,
                    &history,
                    CallPurpose::DecisionTurn { exchange },
                )
                .await?;
            self.run.decision_messages.push(
                MessageRole::Assistant,
                reply,
                PhaseTag::Decision,
                Some(exchange),
            )?;
        }
        Ok(())
    }
}
