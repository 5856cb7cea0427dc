//! Feature extraction: waveform peak envelopes and spectral
//! fingerprints.
//!
//! Both products are derived from a decoded [`SampleBuffer`] and are
//! deterministic: the same buffer always yields bit-identical output.
//! They also fail independently; a fingerprint that collapses on
//! degenerate input never takes the peak envelope down with it.
//!
//! [`SampleBuffer`]: crate::decode::SampleBuffer

mod peaks;
mod spectral;

pub use peaks::{ChannelMode, PeakColumn, WaveformPeaks, compute_peaks};
pub use spectral::{SpectralFingerprint, compute_fingerprint};
