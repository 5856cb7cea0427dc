//! Error types shared across the engine.
//!
//! Each failure domain gets its own enum so callers can match on the
//! class of failure without string inspection. Per-file processing
//! failures never surface as errors from the facade; they end up as a
//! `Failed` job outcome carrying one of these rendered as a reason.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read an audio file into samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be opened or read.
    #[error("unreadable audio file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Neither the native WAV path nor the compressed backend understands
    /// this format.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    /// The container header claims something impossible (zero sample
    /// rate, no frames, truncated sample data).
    #[error("corrupt audio header in {}: {detail}", path.display())]
    CorruptHeader { path: PathBuf, detail: String },
}

/// Numeric failure while deriving a product from a sample buffer.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// The input cannot produce a meaningful result (silent buffer,
    /// band range empty at this sample rate, non-finite energy).
    #[error("degenerate input: {0}")]
    Degenerate(String),
}

/// Failure while persisting or loading cache entries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors surfaced synchronously by the engine facade.
///
/// These cover programmer mistakes and store-only lookups; "this file
/// couldn't be processed" is deliberately not here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller asked to match a file whose fingerprint was never
    /// generated (or failed to generate).
    #[error("no cached fingerprint for {}; generate it first", .0.display())]
    FingerprintUnavailable(PathBuf),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
