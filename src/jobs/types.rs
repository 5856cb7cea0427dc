//! Job lifecycle types, handles and progress events.

use std::sync::{Arc, Condvar, Mutex};

use crate::cache::ProductSet;
use crate::identity::AudioIdentity;

/// Lifecycle of one generation job: `Queued → Running → terminal`.
/// Terminal states are final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Done,
    /// Processing failed; carries a human-readable reason for the UI.
    Failed(String),
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_) | Self::Cancelled)
    }
}

struct JobCell {
    state: JobState,
    products: ProductSet,
    cancel_requested: bool,
}

struct JobInner {
    identity: AudioIdentity,
    cell: Mutex<JobCell>,
    changed: Condvar,
}

/// Shared handle to a queued or running generation job.
///
/// Clones refer to the same job; every caller that submitted the same
/// identity observes the same terminal state.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<JobInner>,
}

impl JobHandle {
    pub(super) fn new(identity: AudioIdentity, products: ProductSet) -> Self {
        Self {
            inner: Arc::new(JobInner {
                identity,
                cell: Mutex::new(JobCell {
                    state: JobState::Queued,
                    products,
                    cancel_requested: false,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    pub fn identity(&self) -> &AudioIdentity {
        &self.inner.identity
    }

    pub fn state(&self) -> JobState {
        self.lock().state.clone()
    }

    /// Block the calling thread (and only it) until the job reaches a
    /// terminal state.
    pub fn wait(&self) -> JobState {
        let mut cell = self.lock();
        while !cell.state.is_terminal() {
            cell = self
                .inner
                .changed
                .wait(cell)
                .expect("job state poisoned");
        }
        cell.state.clone()
    }

    pub(super) fn products(&self) -> ProductSet {
        self.lock().products
    }

    /// Fold more requested products into a job that has not started
    /// extracting yet. Workers snapshot the set after the decode phase.
    pub(super) fn union_products(&self, more: ProductSet) {
        let mut cell = self.lock();
        cell.products = cell.products.union(more);
    }

    pub(super) fn request_cancel(&self) {
        self.lock().cancel_requested = true;
    }

    pub(super) fn cancel_requested(&self) -> bool {
        self.lock().cancel_requested
    }

    /// Transition to `state` unless already terminal; wakes waiters.
    pub(super) fn transition(&self, state: JobState) {
        let mut cell = self.lock();
        if !cell.state.is_terminal() {
            cell.state = state;
            self.inner.changed.notify_all();
        }
    }

    pub(super) fn same_job(&self, other: &JobHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JobCell> {
        self.inner.cell.lock().expect("job state poisoned")
    }
}

/// Messages posted by workers for the consumer (UI or batch tool) to
/// drain on its own schedule. Delivery is fire-and-forget; a consumer
/// that went away is not an error.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A batch progress tick: `completed` of `total` jobs have reached a
    /// terminal state; `identity` is the file that just finished.
    Progress {
        completed: usize,
        total: usize,
        identity: AudioIdentity,
    },
    /// A job reached a terminal state.
    JobFinished {
        identity: AudioIdentity,
        outcome: JobState,
    },
}
