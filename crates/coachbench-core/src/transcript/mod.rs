//! Dialogue transcripts.
//!
//! A [`Transcript`] is append-only: timestamps never go backwards and the
//! discovery exchange index only moves forward for each speaker.

pub mod render;
pub mod types;

pub use render::render_labeled;
pub use types::*;

#[cfg(test)]
mod tests;
