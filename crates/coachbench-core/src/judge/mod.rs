//! Judging engine
//!
//! Scores a completed run against the seven-metric rubric. The overall score
//! is always recomputed from the metric scores with the fixed weights; the
//! judge's own arithmetic is ignored.

pub mod eval;
pub mod parse;
pub mod rubric;
pub mod types;

pub use eval::{build_judge_prompt, JudgeEngine, Judgement};
pub use parse::{anchoring_warning, coerce_score, parse_report};
pub use rubric::Rubric;
pub use types::*;

#[cfg(test)]
mod tests;
