// crates/engine_core/src/jobs.rs

//! Completion handles for work scheduled on the rayon pool.
//!
//! A [`JobHandle`] stands for "this job and everything it was chained after".
//! Scheduling never blocks: a job whose dependency is still running is parked
//! as a continuation on that dependency and handed to the pool when the
//! dependency finishes, so no pool thread ever sits waiting on another job.

use std::fmt;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

type Continuation = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct JobState {
    done: bool,
    continuations: Vec<Continuation>,
}

#[derive(Default)]
struct JobNode {
    state: Mutex<JobState>,
    finished: Condvar,
}

impl JobNode {
    fn lock(&self) -> MutexGuard<'_, JobState> {
        // Continuations run outside the lock, so the state is never left half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self) {
        let continuations = {
            let mut state = self.lock();
            state.done = true;
            mem::take(&mut state.continuations)
        };
        self.finished.notify_all();
        for continuation in continuations {
            continuation();
        }
    }
}

#[derive(Clone, Default)]
pub struct JobHandle {
    node: Option<Arc<JobNode>>,
}

impl JobHandle {
    /// A handle with nothing to wait for.
    pub fn completed() -> Self {
        Self { node: None }
    }

    /// Run `job` on the rayon pool once `dependency` has completed.
    pub fn schedule<F>(dependency: &JobHandle, job: F) -> JobHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let node = Arc::new(JobNode::default());
        let handle = JobHandle {
            node: Some(Arc::clone(&node)),
        };

        dependency.on_complete(Box::new(move || {
            rayon::spawn(move || {
                job();
                node.finish();
            });
        }));
        handle
    }

    pub fn is_completed(&self) -> bool {
        self.node.as_ref().map_or(true, |node| node.lock().done)
    }

    /// Block the calling thread until the job and its dependencies are done.
    ///
    /// Must not be called from inside a job: the pool thread would wait on
    /// work that may be queued behind it.
    pub fn complete(&self) {
        let Some(node) = &self.node else {
            return;
        };
        let mut state = node.lock();
        while !state.done {
            state = node
                .finished
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// True when both handles refer to the same scheduled job.
    pub fn same_job(&self, other: &JobHandle) -> bool {
        match (&self.node, &other.node) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn on_complete(&self, continuation: Continuation) {
        let Some(node) = &self.node else {
            return continuation();
        };
        let mut state = node.lock();
        if state.done {
            drop(state);
            continuation();
        } else {
            state.continuations.push(continuation);
        }
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("completed", &self.is_completed())
            .finish()
    }
}
