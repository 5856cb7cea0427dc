//! FIFO scheduling with per-identity deduplication.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::debug;

use super::types::{EngineEvent, JobHandle, JobState};
use super::worker::{WorkerContext, spawn_workers};
use crate::cache::ProductSet;
use crate::identity::AudioIdentity;

pub(super) struct PoolState {
    pub(super) queue: VecDeque<JobHandle>,
    pub(super) in_flight: HashMap<AudioIdentity, JobHandle>,
    pub(super) batch_total: usize,
    pub(super) batch_done: usize,
    pub(super) shutting_down: bool,
}

pub(super) struct PoolShared {
    pub(super) state: Mutex<PoolState>,
    pub(super) ready: Condvar,
    pub(super) events: Sender<EngineEvent>,
}

impl PoolShared {
    /// Terminal-state bookkeeping shared by workers and `cancel`:
    /// drop the job from the in-flight table, advance the batch counters
    /// and post progress + completion events. The batch resets once it
    /// drains so the next wave of submissions counts from zero.
    pub(super) fn finish_job(&self, identity: &AudioIdentity, outcome: JobState) {
        let mut state = self.state.lock().expect("scheduler state poisoned");
        state.in_flight.remove(identity);
        state.batch_done += 1;
        let (completed, total) = (state.batch_done, state.batch_total);
        if state.batch_done >= state.batch_total {
            state.batch_done = 0;
            state.batch_total = 0;
        }

        // Posted while still holding the state lock so progress counts
        // arrive in order even when workers finish back to back. The
        // channel is unbounded; sending never blocks.
        let _ = self.events.send(EngineEvent::Progress {
            completed,
            total,
            identity: identity.clone(),
        });
        let _ = self.events.send(EngineEvent::JobFinished {
            identity: identity.clone(),
            outcome,
        });
    }
}

/// Bounded worker pool with an at-most-one-in-flight-per-identity
/// guarantee.
///
/// The scheduler does not know about cache validity; callers submit only
/// the identities they already know need work.
pub struct JobScheduler {
    shared: Arc<PoolShared>,
    workers: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub(crate) fn new(
        worker_count: usize,
        context: WorkerContext,
        events: Sender<EngineEvent>,
    ) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                in_flight: HashMap::new(),
                batch_total: 0,
                batch_done: 0,
                shutting_down: false,
            }),
            ready: Condvar::new(),
            events,
        });

        let workers = spawn_workers(worker_count.max(1), shared.clone(), Arc::new(context));
        debug!(workers = workers.len(), "job scheduler started");

        Self { shared, workers }
    }

    /// Enqueue a generation job for `identity`, or return the handle of
    /// the job already queued or running for it.
    ///
    /// Extra products requested while the existing job is still queued
    /// are folded in; a job that already started keeps its snapshot (the
    /// store merges products per entry, so a follow-up submission after
    /// completion fills the gap).
    pub fn submit(&self, identity: AudioIdentity, products: ProductSet) -> JobHandle {
        let mut state = self.shared.state.lock().expect("scheduler state poisoned");
        let handle = enqueue(&mut state, identity, products);
        drop(state);

        self.shared.ready.notify_one();
        handle
    }

    /// Enqueue a whole batch atomically, so progress events report the
    /// full batch total from the first completion onwards.
    pub fn submit_batch(
        &self,
        requests: Vec<(AudioIdentity, ProductSet)>,
    ) -> Vec<JobHandle> {
        let handles = {
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            requests
                .into_iter()
                .map(|(identity, products)| enqueue(&mut state, identity, products))
                .collect()
        };

        self.shared.ready.notify_all();
        handles
    }

    /// Best-effort cancellation.
    ///
    /// A job still queued is removed without ever running. A running job
    /// gets a cooperative flag it checks between pipeline phases; once
    /// its store write begins it completes and reports `Done`.
    pub fn cancel(&self, handle: &JobHandle) {
        let removed_from_queue = {
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            match state.queue.iter().position(|h| h.same_job(handle)) {
                Some(pos) => {
                    state.queue.remove(pos);
                    true
                }
                None => false,
            }
        };

        if removed_from_queue {
            handle.transition(JobState::Cancelled);
            self.shared
                .finish_job(handle.identity(), JobState::Cancelled);
        } else {
            handle.request_cancel();
        }
    }

    /// Number of jobs currently queued or running.
    pub fn in_flight(&self) -> usize {
        self.shared
            .state
            .lock()
            .expect("scheduler state poisoned")
            .in_flight
            .len()
    }

    fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.lock().expect("scheduler state poisoned");
            state.shutting_down = true;
        }
        self.shared.ready.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn enqueue(state: &mut PoolState, identity: AudioIdentity, products: ProductSet) -> JobHandle {
    if let Some(existing) = state.in_flight.get(&identity) {
        existing.union_products(products);
        return existing.clone();
    }

    let handle = JobHandle::new(identity.clone(), products);
    state.in_flight.insert(identity, handle.clone());
    state.queue.push_back(handle.clone());
    state.batch_total += 1;
    handle
}
