//! Engine facade: one instance orchestrating decode, extraction,
//! caching and matching.
//!
//! For a given identity the lifecycle is `Unknown → Ready` on a cache
//! hit, or `Unknown → Generating → Ready | Failed` on a miss. A `Ready`
//! file falls back to `Unknown` when its size or mtime drifts from the
//! cached entry, detected lazily on the next access rather than by watching
//! the filesystem.
//!
//! The engine is an explicit instance: construct it once, pass it by
//! reference. Workers talk back through an event channel the consumer
//! drains with [`CacheEngine::poll_events`], so no UI toolkit is wired
//! into the engine itself.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::cache::{CacheEntry, CacheStore, ProductSet};
use crate::config::{Settings, default_cache_root};
use crate::decode::{CompressedDecoder, RodioBackend};
use crate::error::EngineError;
use crate::features::SpectralFingerprint;
use crate::identity::AudioIdentity;
use crate::jobs::{EngineEvent, JobHandle, JobScheduler, JobState, WorkerContext};
use crate::matcher::{self, MatchResult};


/// What `ensure_ready` found.
#[derive(Clone)]
pub enum Readiness {
    /// Cached and valid; here is the snapshot.
    Ready(CacheEntry),
    /// A generation job is queued or running; await the handle or watch
    /// the event channel.
    Pending(JobHandle),
}

/// Terminal result of a blocking wait. Processing failures are values,
/// not errors: the engine never raises because a file couldn't be
/// processed.
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    Ready(CacheEntry),
    Failed { reason: String },
    Cancelled,
}

pub struct CacheEngine {
    store: Arc<CacheStore>,
    scheduler: JobScheduler,
    events: Mutex<Receiver<EngineEvent>>,
    settings: Settings,
}

impl CacheEngine {
    /// Build an engine with the default rodio-backed compressed decoder.
    pub fn new(settings: Settings) -> Result<Self, EngineError> {
        Self::with_backend(settings, Arc::new(RodioBackend))
    }

    /// Build an engine with a custom compressed-format backend.
    pub fn with_backend(
        settings: Settings,
        backend: Arc<dyn CompressedDecoder>,
    ) -> Result<Self, EngineError> {
        let root = settings
            .cache
            .root
            .clone()
            .unwrap_or_else(default_cache_root);
        let store = Arc::new(CacheStore::open(&root)?);

        let workers = settings.workers.count.unwrap_or_else(default_worker_count);
        let (events_tx, events_rx) = mpsc::channel();
        let scheduler = JobScheduler::new(
            workers,
            WorkerContext {
                store: store.clone(),
                backend,
                fingerprint: settings.fingerprint.clone(),
                peak_columns: settings.peaks.columns,
            },
            events_tx,
        );

        Ok(Self {
            store,
            scheduler,
            events: Mutex::new(events_rx),
            settings,
        })
    }

    /// Fast path: return the cached entry when it is valid and carries
    /// every requested product; otherwise enqueue generation and return
    /// the job handle. Never blocks on audio work.
    pub fn ensure_ready(
        &self,
        identity: &AudioIdentity,
        products: ProductSet,
    ) -> Result<Readiness, EngineError> {
        if identity.path.as_os_str().is_empty() {
            return Err(EngineError::InvalidArgument("empty path".to_string()));
        }
        if products.is_empty() {
            return Err(EngineError::InvalidArgument(
                "no products requested".to_string(),
            ));
        }

        if let Some(entry) = self.store.get(identity) {
            if entry.has_products(products) {
                return Ok(Readiness::Ready(entry));
            }
        }

        Ok(Readiness::Pending(
            self.scheduler.submit(identity.clone(), products),
        ))
    }

    /// Batch variant of [`ensure_ready`]: cache hits come back as
    /// `Ready`, and every miss is enqueued in one atomic batch so
    /// progress events count against the full total from the first
    /// completion (a folder pre-scan reads `1/20 … 20/20`, not a moving
    /// target).
    ///
    /// [`ensure_ready`]: CacheEngine::ensure_ready
    pub fn ensure_all(
        &self,
        identities: &[AudioIdentity],
        products: ProductSet,
    ) -> Result<Vec<Readiness>, EngineError> {
        if products.is_empty() {
            return Err(EngineError::InvalidArgument(
                "no products requested".to_string(),
            ));
        }

        let mut results: Vec<Option<Readiness>> = Vec::with_capacity(identities.len());
        let mut misses: Vec<usize> = Vec::new();

        for (index, identity) in identities.iter().enumerate() {
            if identity.path.as_os_str().is_empty() {
                return Err(EngineError::InvalidArgument("empty path".to_string()));
            }
            match self.store.get(identity) {
                Some(entry) if entry.has_products(products) => {
                    results.push(Some(Readiness::Ready(entry)));
                }
                _ => {
                    results.push(None);
                    misses.push(index);
                }
            }
        }

        let handles = self.scheduler.submit_batch(
            misses
                .iter()
                .map(|&i| (identities[i].clone(), products))
                .collect(),
        );
        for (&index, handle) in misses.iter().zip(handles) {
            results[index] = Some(Readiness::Pending(handle));
        }

        Ok(results.into_iter().map(|r| r.expect("slot filled")).collect())
    }

    /// Blocking variant of [`ensure_ready`]: waits for generation to
    /// finish. Only the calling thread blocks; workers keep draining
    /// the queue.
    ///
    /// [`ensure_ready`]: CacheEngine::ensure_ready
    pub fn wait_ready(
        &self,
        identity: &AudioIdentity,
        products: ProductSet,
    ) -> Result<WaitOutcome, EngineError> {
        let handle = match self.ensure_ready(identity, products)? {
            Readiness::Ready(entry) => return Ok(WaitOutcome::Ready(entry)),
            Readiness::Pending(handle) => handle,
        };

        match handle.wait() {
            JobState::Done => match self.store.get(identity) {
                Some(entry) => Ok(WaitOutcome::Ready(entry)),
                // The file changed while we were generating; the next
                // access will probe the new identity and regenerate.
                None => Ok(WaitOutcome::Failed {
                    reason: "file changed during generation".to_string(),
                }),
            },
            JobState::Failed(reason) => Ok(WaitOutcome::Failed { reason }),
            JobState::Cancelled => Ok(WaitOutcome::Cancelled),
            state => unreachable!("wait() returned non-terminal state {state:?}"),
        }
    }

    /// Cache-only lookup; never schedules work.
    pub fn get_cached(&self, identity: &AudioIdentity) -> Option<CacheEntry> {
        self.store.get(identity)
    }

    /// Force the next `ensure_ready` for this file to regenerate, even
    /// if the cache looks valid (content changed out-of-band).
    pub fn invalidate(&self, identity: &AudioIdentity) {
        debug!(path = %identity.path.display(), "invalidating cache entry");
        self.store.remove(&identity.path);
    }

    /// Best-effort cancellation of a pending generation job.
    pub fn cancel(&self, handle: &JobHandle) {
        self.scheduler.cancel(handle);
    }

    /// Drain any progress/completion events posted since the last call.
    /// Non-blocking; intended for a UI tick or a batch loop.
    pub fn poll_events(&self) -> Vec<EngineEvent> {
        let events = self.events.lock().expect("event receiver poisoned");
        events.try_iter().collect()
    }

    /// Drop cache entries for files that vanished from the session
    /// folders. Returns the number of entries removed.
    pub fn sweep(&self, known_paths: &HashSet<PathBuf>) -> usize {
        self.store.sweep(known_paths)
    }

    /// Rank `candidates` against the stored fingerprint of `query`.
    ///
    /// Matching reads stored fingerprints only; no decoding happens
    /// here. Candidates without a usable fingerprint are skipped
    /// silently; a query without one is an error the caller can fix by
    /// generating first.
    pub fn find_best_matches(
        &self,
        query: &AudioIdentity,
        candidates: &[AudioIdentity],
    ) -> Result<Vec<MatchResult>, EngineError> {
        let query_fp = self
            .store
            .get(query)
            .and_then(|entry| entry.fingerprint)
            .ok_or_else(|| EngineError::FingerprintUnavailable(query.path.clone()))?;

        let with_fingerprints: Vec<(AudioIdentity, SpectralFingerprint)> = candidates
            .iter()
            .filter_map(|candidate| {
                self.store
                    .get(candidate)
                    .and_then(|entry| entry.fingerprint)
                    .map(|fp| (candidate.clone(), fp))
            })
            .collect();

        Ok(matcher::find_best_matches(
            &query_fp,
            &with_fingerprints,
            &self.settings.matching,
        ))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}
