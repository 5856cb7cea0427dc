//! Pluggable decoder for compressed formats.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, Source};

use super::buffer::SampleBuffer;
use crate::error::DecodeError;

/// Strategy for formats the engine does not parse natively (mp3, flac,
/// ogg, ...). Implementations must be shareable across worker threads.
pub trait CompressedDecoder: Send + Sync {
    fn decode_compressed(&self, path: &Path) -> Result<SampleBuffer, DecodeError>;
}

/// Default backend built on rodio's bundled decoders.
pub struct RodioBackend;

impl CompressedDecoder for RodioBackend {
    fn decode_compressed(&self, path: &Path) -> Result<SampleBuffer, DecodeError> {
        let file = File::open(path).map_err(|e| DecodeError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            DecodeError::UnsupportedFormat(format!("{}: {e}", path.display()))
        })?;

        let channels = source.channels();
        let sample_rate = source.sample_rate();
        let samples: Vec<f32> = source.collect();

        Ok(SampleBuffer {
            samples,
            channels,
            sample_rate,
        })
    }
}
