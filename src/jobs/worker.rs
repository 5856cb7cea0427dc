//! Worker threads running the decode → extract → store pipeline.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::scheduler::PoolShared;
use super::types::{JobHandle, JobState};
use crate::cache::CacheStore;
use crate::config::FingerprintSettings;
use crate::decode::{self, CompressedDecoder};
use crate::features::{ChannelMode, compute_fingerprint, compute_peaks};

/// Everything a worker needs to process a job.
pub(crate) struct WorkerContext {
    pub(crate) store: Arc<CacheStore>,
    pub(crate) backend: Arc<dyn CompressedDecoder>,
    pub(crate) fingerprint: FingerprintSettings,
    pub(crate) peak_columns: u32,
}

pub(super) fn spawn_workers(
    count: usize,
    shared: Arc<PoolShared>,
    context: Arc<WorkerContext>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|i| {
            let shared = shared.clone();
            let context = context.clone();
            thread::Builder::new()
                .name(format!("woodshed-worker-{i}"))
                .spawn(move || worker_loop(shared, context))
                .expect("failed to spawn worker thread")
        })
        .collect()
}

fn worker_loop(shared: Arc<PoolShared>, context: Arc<WorkerContext>) {
    loop {
        let handle = {
            let mut state = shared.state.lock().expect("scheduler state poisoned");
            loop {
                if state.shutting_down {
                    // Jobs still queued at shutdown are abandoned; the
                    // cache simply stays cold for them.
                    return;
                }
                if let Some(handle) = state.queue.pop_front() {
                    break handle;
                }
                state = shared.ready.wait(state).expect("scheduler state poisoned");
            }
        };

        // A cancel may have raced between queueing and pickup.
        if handle.cancel_requested() {
            handle.transition(JobState::Cancelled);
            shared.finish_job(handle.identity(), JobState::Cancelled);
            continue;
        }

        handle.transition(JobState::Running);
        let outcome = run_pipeline(&handle, &context);
        handle.transition(outcome.clone());
        shared.finish_job(handle.identity(), outcome);
    }
}

fn run_pipeline(handle: &JobHandle, context: &WorkerContext) -> JobState {
    let identity = handle.identity();
    debug!(path = %identity.path.display(), "generation started");

    // Phase 1: decode.
    let buffer = match decode::decode(&identity.path, context.backend.as_ref()) {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!(path = %identity.path.display(), error = %e, "decode failed");
            return JobState::Failed(e.to_string());
        }
    };
    if handle.cancel_requested() {
        return JobState::Cancelled;
    }

    // Snapshot after the decode so products folded in by duplicate
    // submissions during a long decode are still honored.
    let products = handle.products();

    // Phase 2: extract. The two products succeed or fail independently.
    let peaks = products
        .peaks
        .then(|| compute_peaks(&buffer, context.peak_columns, ChannelMode::Mixed));

    let mut fingerprint_failure = None;
    let fingerprint = if products.fingerprint {
        match compute_fingerprint(&buffer, &context.fingerprint) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!(
                    path = %identity.path.display(),
                    error = %e,
                    "fingerprint unavailable"
                );
                fingerprint_failure = Some(e.to_string());
                None
            }
        }
    } else {
        None
    };

    if peaks.is_none() && fingerprint.is_none() {
        // Every requested product failed; nothing worth storing.
        return JobState::Failed(
            fingerprint_failure.unwrap_or_else(|| "no products produced".to_string()),
        );
    }
    if handle.cancel_requested() {
        return JobState::Cancelled;
    }

    // Phase 3: store. Past this point the job is beyond cancellation;
    // the write always completes so the cache is never torn.
    match context.store.put(identity, peaks, fingerprint) {
        Ok(_) => {
            debug!(path = %identity.path.display(), "generation done");
            JobState::Done
        }
        Err(e) => {
            warn!(path = %identity.path.display(), error = %e, "cache write failed");
            JobState::Failed(format!("cache write failed: {e}"))
        }
    }
}
