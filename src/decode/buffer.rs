//! Decoded PCM sample buffers.

/// Interleaved f32 samples in `[-1, 1]` plus the stream parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Total duration in whole milliseconds.
    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000 / self.sample_rate as u64) as u32
    }

    /// Average all channels into a mono signal.
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels as usize;
        if channels <= 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Copy out a single channel, if it exists.
    pub fn channel(&self, index: usize) -> Option<Vec<f32>> {
        let channels = self.channels as usize;
        if index >= channels {
            return None;
        }
        Some(
            self.samples
                .iter()
                .skip(index)
                .step_by(channels)
                .copied()
                .collect(),
        )
    }
}
