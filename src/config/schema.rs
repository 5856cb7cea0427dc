use std::path::PathBuf;

use serde::Deserialize;

use crate::matcher::{Confidence, MatchAlgorithm};

/// Top-level engine settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/woodshed/config.toml` or
/// `~/.config/woodshed/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `WOODSHED__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub workers: WorkerSettings,
    pub peaks: PeaksSettings,
    pub fingerprint: FingerprintSettings,
    pub matching: MatchSettings,
    pub library: LibrarySettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache root directory. Defaults to the XDG cache dir
    /// (`~/.cache/woodshed`) when unset.
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WorkerSettings {
    /// Worker pool size. Defaults to available parallelism minus one
    /// (minimum 1) so generation never starves the UI thread.
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PeaksSettings {
    /// Min/max columns stored per file. This is the single render
    /// resolution; zoomed views are resampled from it by the consumer.
    pub columns: u32,
}

impl Default for PeaksSettings {
    fn default() -> Self {
        Self { columns: 800 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FingerprintSettings {
    /// Analysis frame duration in milliseconds (frames do not overlap).
    pub frame_ms: u32,
    /// Number of log-spaced frequency bands per frame.
    pub bands: u16,
    /// Lower edge of the analysis range in Hz.
    pub min_hz: f32,
    /// Upper edge of the analysis range in Hz, capped at Nyquist per
    /// file.
    pub max_hz: f32,
}

impl Default for FingerprintSettings {
    fn default() -> Self {
        Self {
            frame_ms: 100,
            bands: 12,
            min_hz: 60.0,
            max_hz: 8_000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Scoring variant used for `find_best_matches`.
    pub algorithm: MatchAlgorithm,
    /// Scores at or above this read as "probably the same song".
    pub high_confidence: f32,
    /// Scores below this read as "probably unrelated".
    pub low_confidence: f32,
    /// Upper bound on alignment offsets tried per candidate; keeps a
    /// short query against a very long jam affordable.
    pub max_alignment_offsets: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            algorithm: MatchAlgorithm::AlignedCosine,
            high_confidence: 0.7,
            low_confidence: 0.3,
            max_alignment_offsets: 64,
        }
    }
}

impl MatchSettings {
    /// Map a raw score onto a confidence band using the configured
    /// cutoffs.
    pub fn band(&self, score: f32) -> Confidence {
        if score >= self.high_confidence {
            Confidence::High
        } else if score >= self.low_confidence {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions treated as recordings (leading dots and case are
    /// ignored).
    pub extensions: Vec<String>,
    /// Whether to descend into subdirectories.
    pub recursive: bool,
    /// Optional recursion depth cap (WalkDir semantics: the root is
    /// depth 0).
    pub max_depth: Option<usize>,
    /// Whether to include hidden files and directories.
    pub include_hidden: bool,
    /// Whether to follow symlinks while scanning.
    pub follow_links: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec![
                "wav".to_string(),
                "mp3".to_string(),
                "flac".to_string(),
                "ogg".to_string(),
            ],
            recursive: true,
            max_depth: None,
            include_hidden: false,
            follow_links: false,
        }
    }
}
