//! Audio decoding: WAV natively, everything else through a pluggable
//! backend.
//!
//! The engine only needs raw samples plus a sample rate; it never plays
//! audio. WAV files are parsed directly so the common case (practice
//! recorders write WAV) has no extra moving parts, and compressed
//! formats go through the [`CompressedDecoder`] strategy so the backend
//! can be swapped out (or stubbed in tests).

use std::path::Path;

mod backend;
mod buffer;
mod wav;

pub use backend::{CompressedDecoder, RodioBackend};
pub use buffer::SampleBuffer;

use crate::error::DecodeError;


/// Decode `path` into an interleaved sample buffer.
///
/// `.wav`/`.wave` files are parsed natively; any other extension is
/// handed to `backend`. Whatever the source, the result is validated
/// before it is returned: a header reporting a zero sample rate or zero
/// frames is a [`DecodeError::CorruptHeader`], never a buffer that later
/// divides by zero.
pub fn decode(path: &Path, backend: &dyn CompressedDecoder) -> Result<SampleBuffer, DecodeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let buffer = match ext.as_str() {
        "wav" | "wave" => wav::decode_wav(path)?,
        "" => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            )));
        }
        _ => backend.decode_compressed(path)?,
    };

    ensure_sane(path, buffer)
}

fn ensure_sane(path: &Path, buffer: SampleBuffer) -> Result<SampleBuffer, DecodeError> {
    if buffer.sample_rate == 0 {
        return Err(DecodeError::CorruptHeader {
            path: path.to_path_buf(),
            detail: "sample rate is zero".to_string(),
        });
    }
    if buffer.channels == 0 {
        return Err(DecodeError::CorruptHeader {
            path: path.to_path_buf(),
            detail: "channel count is zero".to_string(),
        });
    }
    if buffer.frames() == 0 {
        return Err(DecodeError::CorruptHeader {
            path: path.to_path_buf(),
            detail: "no audio frames".to_string(),
        });
    }
    Ok(buffer)
}
