//! Completion tracking for dispatched batches.
//!
//! Every task in a batch moves through a small state machine:
//!
//! ```text
//! PENDING ──acquire──▶ RUNNING ──ok──▶ DONE
//!    │                    └────err───▶ FAILED
//!    └──pool error / cancelled──────▶ FAILED
//! ```
//!
//! A batch is complete once every task is `Done` or `Failed`.
//! [`Completions`] is the drain-as-ready view: a finite stream of exactly
//! one [`Completed`] per task, in the order the tasks actually finished.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::error::TaskError;
use crate::pool::{PoolStatus, ResourcePool};
use crate::task::TaskId;

/// Lifecycle state of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Submitted, waiting for a resource.
    Pending,
    /// Holding a resource, work in progress.
    Running,
    /// Finished with a value.
    Done,
    /// Finished with an error.
    Failed,
}

impl TaskState {
    /// Check if the state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn can_move_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Done)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Counts of tasks per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Tasks waiting for a resource.
    pub pending: usize,
    /// Tasks holding a resource.
    pub running: usize,
    /// Tasks that succeeded.
    pub done: usize,
    /// Tasks that failed.
    pub failed: usize,
}

impl BatchProgress {
    /// Total number of tasks.
    pub fn total(&self) -> usize {
        self.pending + self.running + self.done + self.failed
    }

    /// Number of tasks in a terminal state.
    pub fn finished(&self) -> usize {
        self.done + self.failed
    }

    /// Check if every task reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.finished() == self.total()
    }
}

/// Shared per-batch state machine.
///
/// Cloning shares the same states.
#[derive(Debug, Clone)]
pub struct BatchTracker {
    states: Arc<Mutex<Vec<TaskState>>>,
}

impl BatchTracker {
    /// Track `len` tasks, all starting as `Pending`.
    pub fn new(len: usize) -> Self {
        Self {
            states: Arc::new(Mutex::new(vec![TaskState::Pending; len])),
        }
    }

    /// Number of tracked tasks.
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    /// Check if no tasks are tracked.
    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }

    /// Current state of a task.
    pub fn state(&self, task_id: TaskId) -> Option<TaskState> {
        self.states.lock().get(task_id.index()).copied()
    }

    /// Move a task to `next`.
    ///
    /// Returns `false` and leaves the state untouched if the transition is
    /// not allowed (for example `Done → Running`).
    pub fn transition(&self, task_id: TaskId, next: TaskState) -> bool {
        let mut states = self.states.lock();
        match states.get_mut(task_id.index()) {
            Some(state) if state.can_move_to(next) => {
                *state = next;
                true
            }
            Some(state) => {
                warn!(task_id = %task_id, from = %state, to = %next, "Rejected task state transition");
                false
            }
            None => false,
        }
    }

    /// Counts of tasks per state.
    pub fn progress(&self) -> BatchProgress {
        let states = self.states.lock();
        let mut progress = BatchProgress::default();
        for state in states.iter() {
            match state {
                TaskState::Pending => progress.pending += 1,
                TaskState::Running => progress.running += 1,
                TaskState::Done => progress.done += 1,
                TaskState::Failed => progress.failed += 1,
            }
        }
        progress
    }

    /// Check if every task reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.states.lock().iter().all(|s| s.is_terminal())
    }
}

/// Outcome of one task.
#[derive(Debug, Clone)]
pub struct Completed<T> {
    /// The task that produced this outcome.
    pub task_id: TaskId,
    /// Time spent waiting for a resource.
    pub queued: Duration,
    /// Time spent running while holding the resource.
    pub elapsed: Duration,
    /// The task's value or error.
    pub result: Result<T, TaskError>,
}

impl<T> Completed<T> {
    /// Check if the task succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Get the value if successful.
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Get the error if failed.
    pub fn error(&self) -> Option<&TaskError> {
        self.result.as_ref().err()
    }

    /// Take the value, discarding timing.
    pub fn into_result(self) -> Result<T, TaskError> {
        self.result
    }

    pub(crate) fn failed(task_id: TaskId, queued: Duration, error: TaskError) -> Self {
        Self {
            task_id,
            queued,
            elapsed: Duration::ZERO,
            result: Err(error),
        }
    }
}

/// Results of a concurrently dispatched batch, in completion order.
///
/// Yields exactly one item per task and then ends. Dropping it before the
/// end stops tasks that are still waiting for a resource; tasks already
/// running finish and their results are discarded.
pub struct Completions<T, R> {
    receiver: mpsc::UnboundedReceiver<Completed<T>>,
    cancel: watch::Sender<bool>,
    tracker: BatchTracker,
    pool: ResourcePool<R>,
    total: usize,
    yielded: usize,
}

impl<T, R> Completions<T, R> {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<Completed<T>>,
        cancel: watch::Sender<bool>,
        tracker: BatchTracker,
        pool: ResourcePool<R>,
        total: usize,
    ) -> Self {
        Self {
            receiver,
            cancel,
            tracker,
            pool,
            total,
            yielded: 0,
        }
    }

    /// Cancel every task that has not acquired a resource yet.
    ///
    /// The stream still yields one item per task: cancelled tasks come back
    /// as [`TaskErrorKind::Cancelled`](crate::error::TaskErrorKind::Cancelled),
    /// tasks already running report their real outcome.
    pub fn cancel_pending(&self) {
        self.cancel.send_replace(true);
    }

    /// Check whether [`cancel_pending`](Self::cancel_pending) was called.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Wait for the next task to finish.
    ///
    /// Returns `None` once every task has been yielded.
    pub async fn recv(&mut self) -> Option<Completed<T>> {
        if self.yielded == self.total {
            return None;
        }
        let next = self.receiver.recv().await;
        if next.is_some() {
            self.yielded += 1;
        }
        next
    }

    /// Number of tasks in the batch.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of results not yet yielded.
    pub fn remaining(&self) -> usize {
        self.total - self.yielded
    }

    /// Per-state counts for the batch.
    pub fn progress(&self) -> BatchProgress {
        self.tracker.progress()
    }

    /// The batch's state machine.
    pub fn tracker(&self) -> &BatchTracker {
        &self.tracker
    }

    /// Status of the pool serving this batch.
    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }
}

// Nothing inside is structurally pinned.
impl<T, R> Unpin for Completions<T, R> {}

impl<T, R> Stream for Completions<T, R> {
    type Item = Completed<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.yielded == this.total {
            return Poll::Ready(None);
        }
        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                this.yielded += 1;
                Poll::Ready(Some(item))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.yielded;
        (remaining, Some(remaining))
    }
}
