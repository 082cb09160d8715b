//! One shared execution of a search node.
//!
//! A task starts out queued with the job that evaluates it. Whoever gets to it first
//! runs it: normally a pool worker, but a caller waiting on a task that is still
//! queued runs the job on its own thread. Nested searches can then never starve a
//! bounded pool.

use std::{
    fmt, mem,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use spanq_spans::CancellationToken;

use crate::{Descriptor, SearchError, SearchResult};

/// How often a waiter rechecks its own cancellation token.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// The job that evaluates a task.
pub(crate) type Job = Box<dyn FnOnce() -> Outcome + Send>;

/// How a task ended.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// Evaluation produced a result.
    Completed(SearchResult),
    /// Cancellation was requested before the result was complete.
    Cancelled,
    /// Evaluation failed.
    Failed(SearchError),
}

impl Outcome {
    /// Converts to the caller-facing result.
    pub(crate) fn into_result(self) -> Result<SearchResult, SearchError> {
        match self {
            Self::Completed(result) => Ok(result),
            Self::Cancelled => Err(SearchError::Cancelled),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Lifecycle of a task.
enum TaskState {
    /// Waiting for a thread to run the job.
    Queued(Job),
    /// The job is executing.
    Running,
    /// Finished; the outcome is shared with every waiter.
    Done(Outcome),
}

/// A single execution shared by every caller that asked for the same descriptor.
pub(crate) struct SearchTask {
    /// Distinguishes this execution from later ones for the same descriptor.
    id: u64,
    /// What is being computed.
    descriptor: Descriptor,
    /// Current lifecycle state.
    state: Mutex<TaskState>,
    /// Signalled when the task reaches `Done`.
    finished: Condvar,
    /// Polled by the evaluation.
    cancel: CancellationToken,
    /// Set once a thread has picked up the job.
    started: AtomicBool,
}

impl fmt::Debug for SearchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchTask")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("started", &self.was_started())
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

impl SearchTask {
    /// Creates a queued task. `cancel` must be the token the job polls.
    pub(crate) fn new(id: u64, descriptor: Descriptor, cancel: CancellationToken, job: Job) -> Self {
        Self {
            id,
            descriptor,
            state: Mutex::new(TaskState::Queued(job)),
            finished: Condvar::new(),
            cancel,
            started: AtomicBool::new(false),
        }
    }

    /// Execution id.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// What is being computed.
    pub(crate) fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Whether a thread has picked up the job.
    pub(crate) fn was_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Whether an outcome is available.
    pub(crate) fn is_done(&self) -> bool {
        matches!(*self.state.lock(), TaskState::Done(_))
    }

    /// Whether cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs the job on the calling thread unless another thread already has.
    pub(crate) fn run_if_queued(&self) {
        let job = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, TaskState::Running) {
                TaskState::Queued(job) => job,
                other => {
                    *state = other;
                    return;
                }
            }
        };
        self.started.store(true, Ordering::Release);
        let outcome = job();
        *self.state.lock() = TaskState::Done(outcome);
        self.finished.notify_all();
    }

    /// Requests cancellation. A task that has not started yet is finished on the
    /// spot; a running one stops at its next cancellation check.
    ///
    /// Returns true if the task was still queued, so no job will report its end.
    pub(crate) fn cancel(&self) -> bool {
        self.cancel.cancel();
        let mut state = self.state.lock();
        if !matches!(*state, TaskState::Queued(_)) {
            return false;
        }
        *state = TaskState::Done(Outcome::Cancelled);
        drop(state);
        self.finished.notify_all();
        tracing::debug!(descriptor = %self.descriptor, "cancelled queued search");
        true
    }

    /// The outcome, if the task has finished.
    pub(crate) fn outcome(&self) -> Option<Outcome> {
        match &*self.state.lock() {
            TaskState::Done(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Blocks until the task finishes.
    ///
    /// Without a deadline a still-queued job is run on the calling thread first.
    /// Returns `None` if the deadline passes first. A cancelled `parent` ends the
    /// wait with [`Outcome::Cancelled`] without cancelling the shared task.
    pub(crate) fn wait(
        &self,
        deadline: Option<Instant>,
        parent: Option<&CancellationToken>,
    ) -> Option<Outcome> {
        if deadline.is_none() {
            self.run_if_queued();
        }
        let mut state = self.state.lock();
        loop {
            if let TaskState::Done(outcome) = &*state {
                return Some(outcome.clone());
            }
            if parent.is_some_and(CancellationToken::is_cancelled) {
                return Some(Outcome::Cancelled);
            }
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    remaining.min(WAIT_POLL)
                }
                None => WAIT_POLL,
            };
            self.finished.wait_for(&mut state, slice);
        }
    }
}
