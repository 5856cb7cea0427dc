//! Fingerprint similarity: ranking candidate recordings against a query.
//!
//! The matcher only ever sees stored fingerprints, never raw audio, so
//! it can score an entire reference folder without touching a decoder.
//! Scores are normalized to `[0, 1]` and the ranking is fully
//! deterministic: ties fall back to duration proximity, then identity
//! order.

mod score;

pub use score::{Confidence, MatchAlgorithm, MatchResult, find_best_matches};

#[cfg(test)]
mod tests;
