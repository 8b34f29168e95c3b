//! Configuration type definitions

use serde::{Deserialize, Serialize};

use crate::gateway::openai::DEFAULT_BASE_URL;

/// Tunables for an evaluation batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Sampling temperature for the coach under test
    pub candidate_temperature: f32,

    /// Deterministic temperature shared by the judge and the synthetic user
    pub judge_temperature: f32,

    /// Minimum distinct items before a bucket counts as complete
    pub min_answers_per_phase: usize,

    /// Upper bound on exchange pairs in one bucket sub-dialogue
    pub bucket_exchange_cap: u32,

    /// Scenarios drawn for each candidate model
    pub scenarios_per_model: usize,

    pub shuffle_scenarios: bool,

    /// Seed for scenario shuffling; random when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,

    /// Snapshots older than this are ignored on resume
    pub snapshot_max_age_secs: u64,

    pub max_tokens: MaxTokens,

    pub gateway: GatewayConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            candidate_temperature: 0.7,
            judge_temperature: 0.0,
            min_answers_per_phase: 3,
            bucket_exchange_cap: 10,
            scenarios_per_model: 3,
            shuffle_scenarios: false,
            shuffle_seed: None,
            snapshot_max_age_secs: 7200,
            max_tokens: MaxTokens::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Output token limits per kind of pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxTokens {
    pub coach_turn: u32,
    pub persona_turn: u32,
    pub extraction: u32,
    pub judge: u32,
}

impl Default for MaxTokens {
    fn default() -> Self {
        Self {
            coach_turn: 600,
            persona_turn: 300,
            extraction: 1200,
            judge: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}
