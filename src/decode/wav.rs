//! Native WAV decoding via hound.

use std::path::Path;

use super::buffer::SampleBuffer;
use crate::error::DecodeError;

/// Read a WAV file into an interleaved f32 buffer.
///
/// hound streams samples through a buffered reader, so the raw file is
/// never loaded wholesale; only the converted samples accumulate.
pub(super) fn decode_wav(path: &Path) -> Result<SampleBuffer, DecodeError> {
    let reader = hound::WavReader::open(path).map_err(|e| map_open_error(path, e))?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels;

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => collect_samples(
            path,
            reader.into_samples::<i16>(),
            |s| s as f32 / i16::MAX as f32,
        )?,
        (hound::SampleFormat::Int, 24) => collect_samples(
            path,
            reader.into_samples::<i32>(),
            |s| s as f32 / 8_388_608.0, // 2^23
        )?,
        (hound::SampleFormat::Int, 32) => collect_samples(
            path,
            reader.into_samples::<i32>(),
            |s| s as f32 / i32::MAX as f32,
        )?,
        (hound::SampleFormat::Float, 32) => {
            collect_samples(path, reader.into_samples::<f32>(), |s| s)?
        }
        (fmt, bits) => {
            return Err(DecodeError::UnsupportedFormat(format!(
                "WAV {:?} {}-bit in {}",
                fmt,
                bits,
                path.display()
            )));
        }
    };

    Ok(SampleBuffer {
        samples,
        channels,
        sample_rate,
    })
}

fn collect_samples<S, F>(
    path: &Path,
    iter: hound::WavIntoSamples<std::io::BufReader<std::fs::File>, S>,
    convert: F,
) -> Result<Vec<f32>, DecodeError>
where
    S: hound::Sample,
    F: Fn(S) -> f32,
{
    iter.map(|s| {
        s.map(&convert).map_err(|e| DecodeError::CorruptHeader {
            path: path.to_path_buf(),
            detail: format!("bad sample data: {e}"),
        })
    })
    .collect()
}

fn map_open_error(path: &Path, err: hound::Error) -> DecodeError {
    match err {
        hound::Error::IoError(source) => DecodeError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
        other => DecodeError::CorruptHeader {
            path: path.to_path_buf(),
            detail: other.to_string(),
        },
    }
}
