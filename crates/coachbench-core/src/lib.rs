//! Coachbench Core Library
//!
//! Evaluation pipeline for conversational coaching models: scripted
//! three-phase dialogues against a synthetic persona, model-assisted profile
//! extraction, evidence-ledger judging and leaderboard aggregation.

pub mod config;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod json_repair;
pub mod judge;
pub mod leaderboard;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod profile;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod scenario;
pub mod simulator;
pub mod snapshot;
pub mod text;
pub mod transcript;
pub mod usage;
