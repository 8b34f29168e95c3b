//! Token accounting per phase and per role
//!
//! Every gateway call returns its own [`TokenUsage`]; the orchestrator merges
//! those into a run-owned [`UsageLedger`] rather than any shared counter.

use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::model::ModelRole;

/// Input/output token counts reported by one or more model calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }

    pub fn total(&self) -> u64 {
        self.input + self.output
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input += rhs.input;
        self.output += rhs.output;
    }
}

/// Phases of an evaluation run, used for accounting and progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalPhase {
    Discovery,
    BucketBuild,
    Decision,
    Judging,
}

impl EvalPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalPhase::Discovery => "discovery",
            EvalPhase::BucketBuild => "bucket_build",
            EvalPhase::Decision => "decision",
            EvalPhase::Judging => "judging",
        }
    }
}

impl std::fmt::Display for EvalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage split by the role that produced it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUsage {
    #[serde(default)]
    pub candidate: TokenUsage,
    #[serde(default)]
    pub synthetic_user: TokenUsage,
    #[serde(default)]
    pub judge: TokenUsage,
}

impl RoleUsage {
    pub fn get(&self, role: ModelRole) -> TokenUsage {
        match role {
            ModelRole::Candidate => self.candidate,
            ModelRole::SyntheticUser => self.synthetic_user,
            ModelRole::Judge => self.judge,
        }
    }

    fn slot(&mut self, role: ModelRole) -> &mut TokenUsage {
        match role {
            ModelRole::Candidate => &mut self.candidate,
            ModelRole::SyntheticUser => &mut self.synthetic_user,
            ModelRole::Judge => &mut self.judge,
        }
    }

    pub fn total(&self) -> TokenUsage {
        let mut total = self.candidate;
        total += self.synthetic_user;
        total += self.judge;
        total
    }
}

/// Per-run token ledger keyed by phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageLedger {
    phases: BTreeMap<EvalPhase, RoleUsage>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: EvalPhase, role: ModelRole, usage: TokenUsage) {
        *self.phases.entry(phase).or_default().slot(role) += usage;
    }

    /// Fold another ledger into this one
    pub fn merge(&mut self, other: &UsageLedger) {
        for (phase, usage) in &other.phases {
            for role in ModelRole::ALL {
                self.record(*phase, role, usage.get(role));
            }
        }
    }

    pub fn phase(&self, phase: EvalPhase) -> RoleUsage {
        self.phases.get(&phase).copied().unwrap_or_default()
    }

    pub fn role_total(&self, role: ModelRole) -> TokenUsage {
        let mut total = TokenUsage::default();
        for usage in self.phases.values() {
            total += usage.get(role);
        }
        total
    }

    pub fn total(&self) -> TokenUsage {
        let mut total = TokenUsage::default();
        for usage in self.phases.values() {
            total += usage.total();
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.total().is_zero()
    }
}
