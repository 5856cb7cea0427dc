//! Min/max waveform envelopes for rendering.

use serde::{Deserialize, Serialize};

use crate::decode::SampleBuffer;

/// One render column: amplitude extremes across the column's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakColumn {
    pub min: i16,
    pub max: i16,
}

/// Downsampled min/max envelope at a fixed render resolution.
///
/// Zoomed views are resampled from these columns by the consumer; the
/// engine stores a single resolution per file. An empty `columns` means
/// "not computed", never "silent audio"; silence still produces columns
/// of zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformPeaks {
    pub sample_count: u32,
    pub duration_ms: u32,
    pub columns: Vec<PeakColumn>,
    /// Right-channel columns in split mode; `columns` is then the left
    /// channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Vec<PeakColumn>>,
}

/// How to fold multi-channel input into the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Average all channels into one column sequence.
    #[default]
    Mixed,
    /// Keep left and right as independent sequences (mono input falls
    /// back to a single sequence).
    Split,
}

/// Compute the peak envelope of `buffer` at `target_columns` resolution.
///
/// The sample range is split into equal-width windows, the last window
/// absorbing the remainder. `target_columns` greater than the frame
/// count is clamped down so a window is never zero frames wide; zero
/// frames or zero requested columns produce an empty-but-valid result.
pub fn compute_peaks(
    buffer: &SampleBuffer,
    target_columns: u32,
    mode: ChannelMode,
) -> WaveformPeaks {
    let frames = buffer.frames();
    let duration_ms = buffer.duration_ms();

    if frames == 0 || target_columns == 0 {
        return WaveformPeaks {
            sample_count: frames as u32,
            duration_ms,
            columns: Vec::new(),
            right: None,
        };
    }

    let columns = (target_columns as usize).min(frames);

    let (columns, right) = match mode {
        ChannelMode::Split if buffer.channels >= 2 => {
            let left = buffer.channel(0).unwrap_or_default();
            let right = buffer.channel(1).unwrap_or_default();
            (envelope(&left, columns), Some(envelope(&right, columns)))
        }
        _ => (envelope(&buffer.to_mono(), columns), None),
    };

    WaveformPeaks {
        sample_count: frames as u32,
        duration_ms,
        columns,
        right,
    }
}

fn envelope(samples: &[f32], columns: usize) -> Vec<PeakColumn> {
    let frames = samples.len();
    let width = frames / columns;

    (0..columns)
        .map(|i| {
            let start = i * width;
            let end = if i + 1 == columns {
                frames
            } else {
                start + width
            };

            let mut min = f32::MAX;
            let mut max = f32::MIN;
            for &s in &samples[start..end] {
                min = min.min(s);
                max = max.max(s);
            }
            PeakColumn {
                min: to_i16(min),
                max: to_i16(max),
            }
        })
        .collect()
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
