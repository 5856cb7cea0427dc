//! woodshed: waveform and fingerprint cache engine for reviewing
//! recorded practice sessions.
//!
//! The engine derives two compact products from each recording: a
//! min/max peak envelope for waveform rendering and a spectral
//! fingerprint for matching the same song across sessions. Products are
//! cached on disk keyed by file identity (path + size + mtime) and
//! regenerated lazily when a file changes; generation runs on a bounded
//! worker pool that posts progress over a channel instead of calling
//! into any UI toolkit.
//!
//! Typical use:
//!
//! ```no_run
//! use woodshed::{CacheEngine, ProductSet, Settings};
//! use woodshed::identity::AudioIdentity;
//!
//! let engine = CacheEngine::new(Settings::default()).unwrap();
//! let id = AudioIdentity::probe("session/take-01.wav".as_ref()).unwrap();
//! match engine.wait_ready(&id, ProductSet::ALL).unwrap() {
//!     woodshed::WaitOutcome::Ready(entry) => {
//!         let peaks = entry.peaks.unwrap();
//!         println!("{} columns", peaks.columns.len());
//!     }
//!     outcome => eprintln!("not ready: {outcome:?}"),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod features;
pub mod identity;
pub mod jobs;
pub mod library;
pub mod matcher;

pub use cache::{CacheEntry, CacheStore, ProductSet};
pub use config::Settings;
pub use engine::{CacheEngine, Readiness, WaitOutcome};
pub use error::{ComputeError, DecodeError, EngineError, StoreError};
pub use features::{SpectralFingerprint, WaveformPeaks};
pub use identity::AudioIdentity;
pub use jobs::{EngineEvent, JobHandle, JobState};
pub use matcher::{Confidence, MatchAlgorithm, MatchResult};
