//! Profiles extracted from a run's dialogue.
//!
//! The [`DiscoveryProfile`] comes from one extraction pass over the discovery
//! transcript. The [`BucketProfile`] is built bucket by bucket and finished
//! with an overlap pass. Model replies come in several JSON shapes; the
//! functions in [`normalize`] fold them into these types and fall back to
//! empty values rather than failing.

pub mod normalize;
pub mod types;

pub use normalize::{normalize_bucket, normalize_discovery, normalize_overlaps};
pub use types::*;
