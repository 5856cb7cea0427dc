//! Similarity scoring between spectral fingerprints.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::MatchSettings;
use crate::features::SpectralFingerprint;
use crate::identity::AudioIdentity;

/// Which scoring variant produced a result. Kept on every match so a
/// caller can present more than one algorithm's opinion side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAlgorithm {
    /// Slide the shorter frame sequence along the longer one and take
    /// the best mean per-frame cosine. Tolerant of recordings that
    /// start late or run long.
    AlignedCosine,
    /// Cosine between time-averaged band profiles. Duration-independent
    /// and cheap; a useful second opinion.
    BandProfile,
}

/// Confidence band for presenting a score; cutoffs live in
/// [`MatchSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// One scored candidate. Transient; the engine never persists these.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub identity: AudioIdentity,
    pub score: f32,
    pub algorithm: MatchAlgorithm,
}

/// Score every candidate against `query`, ranked best first.
///
/// Frames are L2-normalized before comparison so a quieter recording of
/// the same performance still scores highly. Candidates fingerprinted
/// with a different band count are skipped (they predate a config
/// change and cannot be compared meaningfully). Empty inputs yield an
/// empty ranking, not an error.
pub fn find_best_matches(
    query: &SpectralFingerprint,
    candidates: &[(AudioIdentity, SpectralFingerprint)],
    settings: &MatchSettings,
) -> Vec<MatchResult> {
    if query.bands.is_empty() {
        return Vec::new();
    }

    let algorithm = settings.algorithm;
    let query_frames = unit_frames(&query.bands);

    let mut scored: Vec<(MatchResult, u32)> = candidates
        .iter()
        .filter(|(_, fp)| !fp.bands.is_empty() && fp.band_count == query.band_count)
        .map(|(identity, fp)| {
            let score = match algorithm {
                MatchAlgorithm::AlignedCosine => aligned_cosine(
                    &query_frames,
                    &unit_frames(&fp.bands),
                    settings.max_alignment_offsets,
                ),
                MatchAlgorithm::BandProfile => profile_cosine(&query.bands, &fp.bands),
            };
            (
                MatchResult {
                    identity: identity.clone(),
                    score: score.clamp(0.0, 1.0),
                    algorithm,
                },
                fp.frame_count,
            )
        })
        .collect();

    scored.sort_by(|(a, a_frames), (b, b_frames)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let a_gap = a_frames.abs_diff(query.frame_count);
                let b_gap = b_frames.abs_diff(query.frame_count);
                a_gap.cmp(&b_gap)
            })
            .then_with(|| a.identity.cmp(&b.identity))
    });

    scored.into_iter().map(|(result, _)| result).collect()
}

/// Frames scaled to unit L2 norm; silent frames stay all-zero.
fn unit_frames(frames: &[Vec<f32>]) -> Vec<Vec<f32>> {
    frames
        .iter()
        .map(|frame| {
            let norm = frame.iter().map(|&e| e * e).sum::<f32>().sqrt();
            if norm > 0.0 {
                frame.iter().map(|&e| e / norm).collect()
            } else {
                vec![0.0; frame.len()]
            }
        })
        .collect()
}

/// Similarity of two unit frames. Energies are non-negative, so the
/// cosine already lands in `[0, 1]`; two silent frames count as a
/// perfect match, one silent frame as none.
fn frame_similarity(a: &[f32], b: &[f32]) -> f32 {
    let a_silent = a.iter().all(|&e| e == 0.0);
    let b_silent = b.iter().all(|&e| e == 0.0);
    match (a_silent, b_silent) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => a.iter().zip(b).map(|(&x, &y)| x * y).sum(),
    }
}

/// Best mean frame similarity over all alignments of the shorter
/// sequence within the longer one. The offset grid is thinned to at
/// most `max_offsets` positions so wildly different durations stay
/// affordable without giving up determinism.
fn aligned_cosine(a: &[Vec<f32>], b: &[Vec<f32>], max_offsets: usize) -> f32 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }

    let span = long.len() - short.len();
    let step = (span / max_offsets.max(1)).max(1);

    let mean_at = |offset: usize| {
        short
            .iter()
            .zip(&long[offset..offset + short.len()])
            .map(|(qa, qb)| frame_similarity(qa, qb))
            .sum::<f32>()
            / short.len() as f32
    };

    let mut best = 0.0f32;
    let mut offset = 0;
    while offset <= span {
        best = best.max(mean_at(offset));
        offset += step;
    }
    if span % step != 0 {
        // The thinned grid skipped the flush-right alignment; check it.
        best = best.max(mean_at(span));
    }
    best
}

/// Cosine between time-averaged band profiles.
fn profile_cosine(a: &[Vec<f32>], b: &[Vec<f32>]) -> f32 {
    let profile = |frames: &[Vec<f32>]| -> Vec<f32> {
        let bands = frames[0].len();
        let mut sum = vec![0.0f32; bands];
        for frame in frames {
            for (acc, &e) in sum.iter_mut().zip(frame) {
                *acc += e;
            }
        }
        let norm = sum.iter().map(|&e| e * e).sum::<f32>().sqrt();
        if norm > 0.0 {
            sum.iter_mut().for_each(|e| *e /= norm);
        }
        sum
    };

    frame_similarity(&profile(a), &profile(b))
}
