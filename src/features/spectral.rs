//! Spectral fingerprints: per-frame frequency-band energy.

use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};

use crate::config::FingerprintSettings;
use crate::decode::SampleBuffer;
use crate::error::ComputeError;

/// Per-time-frame frequency-band energy summary used for similarity
/// matching.
///
/// Every inner vector has exactly `band_count` non-negative, finite
/// energies; frames are chronological and never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralFingerprint {
    pub frame_count: u32,
    pub frame_interval_ms: u32,
    pub band_count: u16,
    pub bands: Vec<Vec<f32>>,
}

/// Compute the spectral fingerprint of `buffer`.
///
/// The mono mix is cut into fixed-duration non-overlapping frames
/// (`settings.frame_ms`); a trailing frame shorter than the analysis
/// window is dropped rather than zero-padded, so the last frame's band
/// energies are never biased by padding. Each frame is transformed with
/// a forward FFT and the magnitude-squared spectrum is summed into
/// log-spaced bands between `min_hz` and `max_hz` (capped at Nyquist).
///
/// Degenerate input (silence, a band range the sample rate cannot
/// represent, non-finite energy) fails with [`ComputeError::Degenerate`]
/// so the file's fingerprint is marked unavailable instead of poisoning
/// downstream matching.
pub fn compute_fingerprint(
    buffer: &SampleBuffer,
    settings: &FingerprintSettings,
) -> Result<SpectralFingerprint, ComputeError> {
    let rate = buffer.sample_rate;
    let frame_len = (rate as u64 * settings.frame_ms as u64 / 1000) as usize;
    if frame_len == 0 {
        return Err(ComputeError::Degenerate(format!(
            "frame of {} ms holds no samples at {} Hz",
            settings.frame_ms, rate
        )));
    }

    let band_count = settings.bands as usize;
    if band_count == 0 {
        return Err(ComputeError::Degenerate("zero frequency bands".to_string()));
    }

    let nyquist = rate as f32 / 2.0;
    let max_hz = settings.max_hz.min(nyquist);
    if settings.min_hz <= 0.0 || settings.min_hz >= max_hz {
        return Err(ComputeError::Degenerate(format!(
            "band range {}..{} Hz is empty at sample rate {}",
            settings.min_hz, max_hz, rate
        )));
    }

    let edges = log_spaced_edges(settings.min_hz, max_hz, band_count);
    let bin_bands = bin_band_map(frame_len, rate, &edges);

    let mono = buffer.to_mono();
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_len);

    let mut frames = Vec::with_capacity(mono.len() / frame_len);
    let mut total_energy = 0.0f64;

    for chunk in mono.chunks_exact(frame_len) {
        let mut spectrum: Vec<Complex<f32>> = chunk
            .iter()
            .map(|&v| Complex { re: v, im: 0.0 })
            .collect();
        fft.process(&mut spectrum);

        let mut energies = vec![0.0f32; band_count];
        for (bin, c) in spectrum[..frame_len / 2].iter().enumerate() {
            if let Some(band) = bin_bands[bin] {
                energies[band] += c.norm_sqr();
            }
        }

        if energies.iter().any(|e| !e.is_finite()) {
            return Err(ComputeError::Degenerate(
                "non-finite band energy".to_string(),
            ));
        }

        total_energy += energies.iter().map(|&e| e as f64).sum::<f64>();
        frames.push(energies);
    }

    if frames.is_empty() {
        return Err(ComputeError::Degenerate(format!(
            "audio shorter than one {} ms analysis frame",
            settings.frame_ms
        )));
    }
    if total_energy == 0.0 {
        return Err(ComputeError::Degenerate(
            "no spectral energy in the analysis range".to_string(),
        ));
    }

    Ok(SpectralFingerprint {
        frame_count: frames.len() as u32,
        frame_interval_ms: settings.frame_ms,
        band_count: band_count as u16,
        bands: frames,
    })
}

/// `bands + 1` logarithmically spaced edges from `lo` to `hi`.
/// Pitch is multiplicative, so equal ratios beat equal widths here.
fn log_spaced_edges(lo: f32, hi: f32, bands: usize) -> Vec<f32> {
    let step = (hi / lo).ln() / bands as f32;
    (0..=bands).map(|i| lo * (step * i as f32).exp()).collect()
}

/// Map each FFT bin below Nyquist to its band index, or `None` when the
/// bin falls outside the analysis range.
fn bin_band_map(frame_len: usize, rate: u32, edges: &[f32]) -> Vec<Option<usize>> {
    (0..frame_len / 2)
        .map(|bin| {
            let freq = bin as f32 * rate as f32 / frame_len as f32;
            if freq < edges[0] || freq >= edges[edges.len() - 1] {
                return None;
            }
            edges
                .windows(2)
                .position(|w| freq >= w[0] && freq < w[1])
        })
        .collect()
}
