use tracing::{info, warn};

use super::Session;
use crate::error::Result;
use crate::gateway::CallPurpose;
use crate::profile::{normalize_bucket, normalize_overlaps, Bucket, BucketKind, BucketSource, Overlaps};
use crate::progress::PhaseProgress;
use crate::prompts::{bucket_summary_messages, bucket_system, overlap_messages};
use crate::text::{distinct_count, normalize_key};
use crate::transcript::{render_labeled, MessageRole, PhaseTag};
use crate::usage::EvalPhase;

impl<'c, 'a> Session<'c, 'a> {
    /// Fill the four buckets in order, then derive the overlaps
    pub(super) async fn build_buckets(&mut self) -> Result<()> {
        self.progress(PhaseProgress::phase(EvalPhase::BucketBuild));
        let min_items = self.ctx.config.min_answers_per_phase;

        for kind in BucketKind::ALL {
            self.ctx.control.checkpoint().await?;
            let known = self.run.discovery_profile.items_for(kind).to_vec();

            let mut bucket = if kind.auto_fillable() && distinct_count(&known) >= min_items {
                info!(run = %self.run.id, bucket = kind.as_str(), "bucket auto-filled from discovery");
                self.auto_fill(kind, known).await?
            } else {
                self.bucket_dialogue(kind, min_items).await?
            };

            bucket.finalize(min_items);
            if !bucket.complete {
                warn!(
                    run = %self.run.id,
                    bucket = kind.as_str(),
                    items = bucket.distinct_items(),
                    "bucket below minimum item count"
                );
            }
            *self.run.bucket_profile.get_mut(kind) = bucket;
        }

        self.ctx.control.checkpoint().await?;
        self.progress(PhaseProgress::phase(EvalPhase::BucketBuild));
        let messages = overlap_messages(&self.run.bucket_profile);
        let overlaps = match self
            .structured_pass(EvalPhase::BucketBuild, messages, CallPurpose::Overlap)
            .await?
        {
            Some(value) => normalize_overlaps(&value),
            None => Overlaps::default(),
        };
        self.run.bucket_profile.overlaps = overlaps;
        Ok(())
    }

    /// Skip the sub-dialogue; discovery already yielded enough items
    async fn auto_fill(&mut self, kind: BucketKind, known: Vec<String>) -> Result<Bucket> {
        let material = known
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n");
        let summarized = self.summarize(kind, &material).await?;

        let mut items = known;
        let summary = match summarized {
            Some(bucket) => {
                items.extend(bucket.bullets);
                bucket.summary
            }
            None => String::new(),
        };
        let mut bucket = Bucket::new(items, summary);
        bucket.source = BucketSource::AutoFill;
        Ok(bucket)
    }

    /// Coach and persona talk until enough distinct answers are collected or
    /// the exchange cap is reached
    async fn bucket_dialogue(&mut self, kind: BucketKind, min_items: usize) -> Result<Bucket> {
        let tag = PhaseTag::Bucket(kind);
        let cap = self.ctx.config.bucket_exchange_cap;
        let mut answers: Vec<String> = Vec::new();
        let mut exchange = 0;

        while answers.len() < min_items && exchange < cap {
            self.ctx.control.checkpoint().await?;
            exchange += 1;
            self.progress(PhaseProgress::exchange(EvalPhase::BucketBuild, exchange, Some(cap)));

            let history: Vec<_> = self.run.transcript.in_phase(tag).cloned().collect();
            let system = bucket_system(
                kind,
                &self.run.discovery_profile,
                answers.len() as u32,
                min_items,
            );
            let question = self
                .coach_turn(
                    EvalPhase::BucketBuild,
                    system,
                    &history,
                    CallPurpose::BucketTurn { bucket: kind },
                )
                .await?;
            self.run
                .transcript
                .push(MessageRole::Assistant, question, tag, Some(exchange))?;

            let history: Vec<_> = self.run.transcript.in_phase(tag).cloned().collect();
            let turn = self
                .persona_turn(EvalPhase::BucketBuild, &history, kind.topic())
                .await?;
            let substantive = turn.safeguard.is_none()
                && !answers
                    .iter()
                    .any(|a| normalize_key(a) == normalize_key(&turn.text));
            if substantive {
                answers.push(turn.text.clone());
            }
            self.run
                .transcript
                .push(MessageRole::User, turn.text, tag, Some(exchange))?;
        }

        let cap_hit = answers.len() < min_items;
        if cap_hit {
            warn!(
                run = %self.run.id,
                bucket = kind.as_str(),
                answers = answers.len(),
                cap,
                "bucket exchange cap reached"
            );
        }

        let material = render_labeled(self.run.transcript.in_phase(tag));
        let (mut items, summary) = match self.summarize(kind, &material).await? {
            Some(bucket) => (bucket.bullets, bucket.summary),
            None => (Vec::new(), String::new()),
        };
        // A summary that merges answers must not drop the bucket below the minimum
        if distinct_count(&items) < min_items {
            items.extend(answers.iter().cloned());
        }
        let mut bucket = Bucket::new(items, summary);
        bucket.source = BucketSource::Dialogue;
        bucket.answers = answers.len() as u32;
        bucket.cap_hit = cap_hit;
        Ok(bucket)
    }

    async fn summarize(&mut self, kind: BucketKind, material: &str) -> Result<Option<Bucket>> {
        let value = self
            .structured_pass(
                EvalPhase::BucketBuild,
                bucket_summary_messages(kind, material),
                CallPurpose::BucketSummary(kind),
            )
            .await?;
        Ok(value.map(|v| normalize_bucket(kind, &v)))
    }
}
