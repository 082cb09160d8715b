//! Handles returned by the cache.

use std::{
    sync::{Arc, Weak},
    time::{Duration, Instant},
};

use spanq_spans::CancellationToken;

use super::{
    CacheInner, ResultsCache,
    task::{Outcome, SearchTask},
};
use crate::{Descriptor, SearchError, SearchResult};

/// A cached result, or a claim on an execution that will produce it.
///
/// Every handle for the same execution resolves to the same outcome.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// What the entry computes.
    descriptor: Descriptor,
    /// Completed value or shared task.
    state: EntryState,
    /// The cache holding the task's in-flight marker.
    cache: Weak<CacheInner>,
}

/// Either side of a cache lookup.
#[derive(Debug, Clone)]
enum EntryState {
    /// Taken from the completed map.
    Ready(SearchResult),
    /// Waiting on an execution.
    Pending(Arc<SearchTask>),
}

impl CacheEntry {
    /// An entry for a result that is already complete.
    pub(crate) fn ready(descriptor: Descriptor, result: SearchResult) -> Self {
        Self {
            descriptor,
            state: EntryState::Ready(result),
            cache: Weak::new(),
        }
    }

    /// An entry waiting on `task`, which `cache` tracks as in flight.
    pub(crate) fn pending(task: Arc<SearchTask>, cache: &ResultsCache) -> Self {
        Self {
            descriptor: task.descriptor().clone(),
            state: EntryState::Pending(task),
            cache: Arc::downgrade(&cache.inner),
        }
    }

    /// What the entry computes.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Whether evaluation has begun. Always true for a cached result.
    pub fn was_started(&self) -> bool {
        match &self.state {
            EntryState::Ready(_) => true,
            EntryState::Pending(task) => task.was_started(),
        }
    }

    /// Whether an outcome is available without blocking.
    pub fn is_done(&self) -> bool {
        match &self.state {
            EntryState::Ready(_) => true,
            EntryState::Pending(task) => task.is_done(),
        }
    }

    /// Whether cancellation of the underlying execution was requested.
    pub fn is_cancelled(&self) -> bool {
        match &self.state {
            EntryState::Ready(_) => false,
            EntryState::Pending(task) => task.is_cancelled(),
        }
    }

    /// Requests cancellation of the underlying execution.
    ///
    /// The execution is shared, so every caller waiting on it sees `Cancelled`. A
    /// cached result is unaffected. An execution no thread had picked up yet is
    /// forgotten by the cache right away.
    pub fn cancel(&self) {
        if let EntryState::Pending(task) = &self.state
            && task.cancel()
            && let Some(inner) = self.cache.upgrade()
        {
            ResultsCache { inner }.finish(task.descriptor(), task.id(), &Outcome::Cancelled);
        }
    }

    /// Blocks until the outcome is available.
    pub fn wait(&self) -> Result<SearchResult, SearchError> {
        match &self.state {
            EntryState::Ready(result) => Ok(result.clone()),
            EntryState::Pending(task) => task
                .wait(None, None)
                .unwrap_or(Outcome::Cancelled)
                .into_result(),
        }
    }

    /// Blocks for at most `timeout`. Returns `None` if the outcome is still
    /// pending when the time is up.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<SearchResult, SearchError>> {
        match &self.state {
            EntryState::Ready(result) => Some(Ok(result.clone())),
            EntryState::Pending(task) => task
                .wait(Some(Instant::now() + timeout), None)
                .map(Outcome::into_result),
        }
    }

    /// Blocks until the outcome is available or `parent` is cancelled.
    pub(crate) fn wait_within(&self, parent: &CancellationToken) -> Result<SearchResult, SearchError> {
        match &self.state {
            EntryState::Ready(result) => Ok(result.clone()),
            EntryState::Pending(task) => task
                .wait(None, Some(parent))
                .unwrap_or(Outcome::Cancelled)
                .into_result(),
        }
    }
}
