use std::path::PathBuf;

use super::*;
use crate::config::MatchSettings;
use crate::features::SpectralFingerprint;
use crate::identity::AudioIdentity;

fn identity(name: &str) -> AudioIdentity {
    AudioIdentity {
        path: PathBuf::from(format!("/sessions/{name}")),
        size_bytes: 100,
        mtime_ms: 1_700_000_000_000,
    }
}

fn fingerprint(frames: Vec<Vec<f32>>) -> SpectralFingerprint {
    SpectralFingerprint {
        frame_count: frames.len() as u32,
        frame_interval_ms: 100,
        band_count: frames.first().map(|f| f.len()).unwrap_or(0) as u16,
        bands: frames,
    }
}

/// A fingerprint whose energy sits in one band, `frames` frames long.
fn tone_print(band: usize, bands: usize, frames: usize, level: f32) -> SpectralFingerprint {
    let mut frame = vec![0.01; bands];
    frame[band] = level;
    fingerprint(vec![frame; frames])
}

fn settings() -> MatchSettings {
    MatchSettings::default()
}

#[test]
fn self_match_scores_one_and_ranks_first() {
    let query = tone_print(3, 8, 10, 5.0);
    let candidates = vec![
        (identity("other.wav"), tone_print(6, 8, 10, 5.0)),
        (identity("self.wav"), query.clone()),
    ];

    let results = find_best_matches(&query, &candidates, &settings());
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].identity, identity("self.wav"));
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert!(results[0].score > results[1].score);
}

#[test]
fn quieter_recordings_of_the_same_material_still_match() {
    let loud = tone_print(3, 8, 10, 5.0);
    let quiet = tone_print(3, 8, 10, 0.05);

    let results = find_best_matches(&loud, &[(identity("quiet.wav"), quiet)], &settings());
    assert!(results[0].score > 0.99, "score {}", results[0].score);
}

#[test]
fn differing_durations_are_tolerated_by_alignment() {
    // The candidate contains the query's material with extra unrelated
    // frames on both sides.
    let query = tone_print(2, 8, 6, 4.0);
    let mut padded = tone_print(5, 8, 3, 4.0).bands;
    padded.extend(query.bands.clone());
    padded.extend(tone_print(7, 8, 3, 4.0).bands);
    let candidate = fingerprint(padded);

    let results = find_best_matches(&query, &[(identity("long.wav"), candidate)], &settings());
    assert!(results[0].score > 0.95, "score {}", results[0].score);
}

#[test]
fn unrelated_material_scores_low() {
    let query = tone_print(1, 8, 10, 4.0);
    let unrelated = tone_print(6, 8, 10, 4.0);

    let results = find_best_matches(&query, &[(identity("other.wav"), unrelated)], &settings());
    assert!(results[0].score < 0.3, "score {}", results[0].score);
}

#[test]
fn empty_query_or_candidates_yield_empty_results() {
    let query = tone_print(1, 8, 4, 1.0);
    assert!(find_best_matches(&query, &[], &settings()).is_empty());

    let empty = fingerprint(Vec::new());
    let candidates = vec![(identity("a.wav"), query.clone())];
    assert!(find_best_matches(&empty, &candidates, &settings()).is_empty());
}

#[test]
fn candidates_with_empty_or_mismatched_fingerprints_are_skipped() {
    let query = tone_print(1, 8, 4, 1.0);
    let candidates = vec![
        (identity("empty.wav"), fingerprint(Vec::new())),
        (identity("narrow.wav"), tone_print(1, 4, 4, 1.0)),
        (identity("fine.wav"), query.clone()),
    ];

    let results = find_best_matches(&query, &candidates, &settings());
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].identity, identity("fine.wav"));
}

#[test]
fn ties_prefer_the_closer_duration_then_identity_order() {
    let query = tone_print(3, 8, 10, 2.0);
    // Both candidates contain the query exactly, one padded much longer.
    let near = fingerprint(query.bands.iter().cloned().chain(query.bands.iter().cloned().take(1)).collect());
    let far = fingerprint(query.bands.iter().cloned().cycle().take(30).collect());

    let results = find_best_matches(
        &query,
        &[
            (identity("far.wav"), far),
            (identity("near.wav"), near),
        ],
        &settings(),
    );
    assert_eq!(results[0].identity, identity("near.wav"));

    // Exact ties fall back to identity ordering.
    let twin = tone_print(3, 8, 10, 2.0);
    let results = find_best_matches(
        &query,
        &[
            (identity("b.wav"), twin.clone()),
            (identity("a.wav"), twin),
        ],
        &settings(),
    );
    assert_eq!(results[0].identity, identity("a.wav"));
    assert_eq!(results[1].identity, identity("b.wav"));
}

#[test]
fn band_profile_variant_is_reported_on_results() {
    let query = tone_print(3, 8, 10, 2.0);
    let mut cfg = settings();
    cfg.algorithm = MatchAlgorithm::BandProfile;

    let results = find_best_matches(
        &query,
        &[(identity("a.wav"), tone_print(3, 8, 25, 2.0))],
        &cfg,
    );
    assert_eq!(results[0].algorithm, MatchAlgorithm::BandProfile);
    assert!(results[0].score > 0.99);
}

#[test]
fn scores_stay_in_the_unit_interval() {
    let query = tone_print(0, 8, 5, 100.0);
    let candidates: Vec<_> = (0..8)
        .map(|band| (identity(&format!("{band}.wav")), tone_print(band, 8, 9, 0.5)))
        .collect();

    for result in find_best_matches(&query, &candidates, &settings()) {
        assert!((0.0..=1.0).contains(&result.score));
    }
}

#[test]
fn banding_uses_the_configured_cutoffs() {
    let cfg = settings();
    assert_eq!(cfg.band(0.9), Confidence::High);
    assert_eq!(cfg.band(0.5), Confidence::Medium);
    assert_eq!(cfg.band(0.1), Confidence::Low);
}
