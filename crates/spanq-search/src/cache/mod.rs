//! Result cache and execution coordinator.
//!
//! Completed results live in a bounded, time-limited `moka` cache. Executions in
//! flight live in a `DashMap` keyed by the same [`Descriptor`]; claiming a
//! descriptor happens under the map's entry lock, so simultaneous first-time callers
//! agree on exactly one execution and every later caller joins it. An execution that
//! succeeds is published to the completed cache before its in-flight marker is
//! dropped, under the same lock, so a lookup never falls between the two.
//!
//! Failed and cancelled executions are delivered to everyone waiting on them and then
//! forgotten.

mod entry;
mod task;

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use dashmap::{DashMap, mapref::entry::Entry};
pub use entry::CacheEntry;
use moka::{notification::RemovalCause, sync::Cache};
use rayon::{ThreadPool, ThreadPoolBuilder};
use spanq_config::CacheSettings;
use spanq_spans::{CancellationToken, CorpusId};
use task::{Outcome, SearchTask};

use crate::{Descriptor, SearchError, SearchNode, SearchResult, observer::panic_message};

/// Counters describing how the cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Evaluations actually started.
    pub executions: u64,
    /// Lookups answered from the completed cache.
    pub hits: u64,
    /// Lookups that joined an execution already in flight.
    pub fan_ins: u64,
    /// Completed results currently cached.
    pub completed: u64,
    /// Executions currently in flight.
    pub running: usize,
}

/// Shared state behind every clone of a [`ResultsCache`].
struct CacheInner {
    /// Completed results.
    completed: Cache<Descriptor, SearchResult>,
    /// Executions in flight.
    running: DashMap<Descriptor, Arc<SearchTask>>,
    /// Workers evaluating searches.
    pool: ThreadPool,
    /// Source of task ids.
    next_task: AtomicU64,
    /// Evaluations started.
    executions: AtomicU64,
    /// Completed-cache hits.
    hits: AtomicU64,
    /// Joins of in-flight executions.
    fan_ins: AtomicU64,
}

/// Caches search results by descriptor and runs each distinct search at most once
/// at a time.
///
/// Cloning is cheap; clones share the same cache and worker pool.
#[derive(Clone)]
pub struct ResultsCache {
    /// Shared state.
    inner: Arc<CacheInner>,
}

impl fmt::Debug for ResultsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultsCache")
            .field("running", &self.inner.running.len())
            .finish_non_exhaustive()
    }
}

impl ResultsCache {
    /// Creates a cache and starts its worker pool.
    pub fn new(settings: &CacheSettings) -> Result<Self, SearchError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads.max(1))
            .thread_name(|i| format!("spanq-search-{i}"))
            .build()
            .map_err(|e| SearchError::ExecutionFailed(format!("cannot start search workers: {e}")))?;
        let completed = Cache::builder()
            .max_capacity(settings.max_entries)
            .time_to_live(settings.ttl())
            .eviction_listener(|key: Arc<Descriptor>, _value: SearchResult, cause: RemovalCause| {
                tracing::debug!(descriptor = %key, ?cause, "search result evicted");
            })
            .build();
        tracing::debug!(
            workers = pool.current_num_threads(),
            max_entries = settings.max_entries,
            ttl_secs = settings.ttl_secs,
            "search cache started"
        );
        Ok(Self {
            inner: Arc::new(CacheInner {
                completed,
                running: DashMap::new(),
                pool,
                next_task: AtomicU64::new(1),
                executions: AtomicU64::new(0),
                hits: AtomicU64::new(0),
                fan_ins: AtomicU64::new(0),
            }),
        })
    }

    /// Looks up `node`, starting its evaluation if nobody has yet.
    ///
    /// Returns immediately. A completed result comes back ready; otherwise the entry
    /// is a claim on the one execution for this descriptor.
    pub fn get(&self, node: &SearchNode) -> CacheEntry {
        let descriptor = node.descriptor();
        if let Some(entry) = self.completed_entry(descriptor) {
            return entry;
        }

        let task = match self.inner.running.entry(descriptor.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if !current.is_cancelled() && !current.is_done() {
                    self.inner.fan_ins.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%descriptor, "joined running search");
                    return CacheEntry::pending(Arc::clone(current), self);
                }
                // A cancelled execution is never joined.
                let task = self.new_task(node);
                occupied.insert(Arc::clone(&task));
                task
            }
            Entry::Vacant(vacant) => {
                // The execution may have finished since the first lookup.
                if let Some(entry) = self.completed_entry(descriptor) {
                    return entry;
                }
                let task = self.new_task(node);
                vacant.insert(Arc::clone(&task));
                task
            }
        };

        tracing::debug!(%descriptor, task = task.id(), "search queued");
        let queued = Arc::clone(&task);
        self.inner.pool.spawn(move || queued.run_if_queued());
        CacheEntry::pending(task, self)
    }

    /// The completed result for `node`, without starting anything.
    pub fn get_completed(&self, node: &SearchNode) -> Option<SearchResult> {
        self.inner.completed.get(node.descriptor())
    }

    /// Removes `node` from the cache.
    ///
    /// A completed result is removed and returned. An execution still in flight is
    /// cancelled and forgotten.
    pub fn remove(&self, node: &SearchNode) -> Option<SearchResult> {
        let descriptor = node.descriptor();
        if let Some(result) = self.inner.completed.remove(descriptor) {
            tracing::debug!(%descriptor, "removed cached search");
            return Some(result);
        }
        if let Some((_, task)) = self.inner.running.remove(descriptor) {
            tracing::debug!(%descriptor, "cancelling removed search");
            task.cancel();
        }
        None
    }

    /// Removes every completed result computed on `corpus`. Returns how many were
    /// removed. Executions in flight are left alone.
    pub fn remove_for_corpus(&self, corpus: CorpusId) -> usize {
        let stale: Vec<Arc<Descriptor>> = self
            .inner
            .completed
            .iter()
            .filter(|(descriptor, _)| descriptor.corpus() == corpus)
            .map(|(descriptor, _)| descriptor)
            .collect();
        for descriptor in &stale {
            self.inner.completed.invalidate(descriptor.as_ref());
        }
        tracing::debug!(%corpus, removed = stale.len(), "removed cached searches for corpus");
        stale.len()
    }

    /// Drops every completed result. With `cancel_running`, also cancels and forgets
    /// every execution in flight.
    pub fn clear(&self, cancel_running: bool) {
        if cancel_running {
            let mut cancelled = 0_usize;
            self.inner.running.retain(|_, task| {
                task.cancel();
                cancelled += 1;
                false
            });
            if cancelled > 0 {
                tracing::warn!(cancelled, "cancelled running searches");
            }
        }
        self.inner.completed.invalidate_all();
        tracing::debug!(cancel_running, "search cache cleared");
    }

    /// Clears everything and cancels all executions.
    pub fn cleanup(&self) {
        self.clear(true);
    }

    /// Usage counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.completed.run_pending_tasks();
        CacheStats {
            executions: self.inner.executions.load(Ordering::Relaxed),
            hits: self.inner.hits.load(Ordering::Relaxed),
            fan_ins: self.inner.fan_ins.load(Ordering::Relaxed),
            completed: self.inner.completed.entry_count(),
            running: self.inner.running.len(),
        }
    }

    /// A ready entry if the completed cache holds `descriptor`.
    fn completed_entry(&self, descriptor: &Descriptor) -> Option<CacheEntry> {
        let result = self.inner.completed.get(descriptor)?;
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%descriptor, "search cache hit");
        Some(CacheEntry::ready(descriptor.clone(), result))
    }

    /// Creates a queued task that evaluates `node`.
    fn new_task(&self, node: &SearchNode) -> Arc<SearchTask> {
        let id = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let job = {
            let inner = Arc::downgrade(&self.inner);
            let node = node.clone();
            let cancel = cancel.clone();
            move || execute(&inner, &node, id, &cancel)
        };
        Arc::new(SearchTask::new(
            id,
            node.descriptor().clone(),
            cancel,
            Box::new(job),
        ))
    }

    /// Publishes the outcome of execution `id` and drops its in-flight marker.
    ///
    /// Nothing is published if the marker now belongs to another execution or was
    /// removed, which is how `clear` and `remove` keep late results out.
    fn finish(&self, descriptor: &Descriptor, id: u64, outcome: &Outcome) {
        if let Entry::Occupied(occupied) = self.inner.running.entry(descriptor.clone())
            && occupied.get().id() == id
        {
            if let Outcome::Completed(result) = outcome {
                self.inner.completed.insert(descriptor.clone(), result.clone());
            }
            occupied.remove();
        }
    }
}

/// Evaluates `node` as execution `id` and records the outcome.
fn execute(
    inner: &Weak<CacheInner>,
    node: &SearchNode,
    id: u64,
    cancel: &CancellationToken,
) -> Outcome {
    let Some(inner) = inner.upgrade() else {
        return Outcome::Cancelled;
    };
    let cache = ResultsCache { inner };
    let descriptor = node.descriptor();
    if cancel.is_cancelled() {
        cache.finish(descriptor, id, &Outcome::Cancelled);
        return Outcome::Cancelled;
    }

    cache.inner.executions.fetch_add(1, Ordering::Relaxed);
    tracing::info!(%descriptor, task = id, "search started");
    let started = Instant::now();
    let evaluated = panic::catch_unwind(AssertUnwindSafe(|| node.evaluate(&cache, cancel)));
    let outcome = match evaluated {
        Ok(Ok(result)) if !cancel.is_cancelled() => Outcome::Completed(result),
        Ok(Ok(_) | Err(SearchError::Cancelled)) => Outcome::Cancelled,
        Ok(Err(err)) => Outcome::Failed(err),
        Err(payload) => Outcome::Failed(SearchError::ExecutionFailed(format!(
            "search panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };
    cache.finish(descriptor, id, &outcome);

    let elapsed_ms = started.elapsed().as_millis();
    match &outcome {
        Outcome::Completed(result) => {
            tracing::info!(%descriptor, task = id, kind = result.kind(), elapsed_ms, "search finished");
        }
        Outcome::Cancelled => {
            tracing::warn!(%descriptor, task = id, elapsed_ms, "search cancelled");
        }
        Outcome::Failed(err) => {
            tracing::warn!(%descriptor, task = id, error = %err, "search failed");
        }
    }
    outcome
}
