//! Sequential and concurrent batch dispatch over a [`ResourcePool`].
//!
//! - **Sequential**: one task at a time (acquire, run, release, then the
//!   next one). Only one resource is ever in use, so a batch of N tasks
//!   costs roughly N × per-task latency regardless of pool capacity.
//! - **Concurrent**: every task is spawned up front. The pool admits at
//!   most `capacity` of them; the backlog waits in `acquire()`. A batch
//!   costs roughly ⌈N / capacity⌉ × per-task latency.
//!
//! Concurrent results can be collected two ways:
//!
//! | Method | Order | Blocks until |
//! |--------|-------|--------------|
//! | [`Dispatcher::run_concurrent`] / [`Dispatcher::gather`] | submission | every task finished |
//! | [`Dispatcher::as_completed`] | completion | the next task finished |
//!
//! # Failure policy
//!
//! With [`FailurePolicy::Accumulate`] (the default) every task runs and all
//! failures are reported together. With [`FailurePolicy::FailFast`] the
//! first failure stops the batch: tasks still waiting for a resource are
//! cancelled and reported as such.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::collector::{BatchTracker, Completed, Completions, TaskState};
use crate::error::{BatchError, CoreResult, TaskError, TaskErrorKind};
use crate::pool::{PooledResource, ResourcePool};
use crate::task::{Batch, Task, TaskId};

/// How a batch is issued to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// One task at a time.
    Sequential,
    /// All tasks at once, bounded by pool capacity.
    Concurrent,
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// What happens to the rest of a batch when one task fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Run everything and report every failure.
    #[default]
    Accumulate,
    /// Stop at the first failure and cancel tasks that have not started.
    FailFast,
}

/// Configuration for a dispatcher.
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// Failure handling for wait-for-all collection.
    pub failure_policy: FailurePolicy,
}

impl DispatchConfig {
    /// Set the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Summary statistics for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Tasks in the batch.
    pub total: usize,
    /// Tasks that succeeded.
    pub succeeded: usize,
    /// Tasks that failed (including cancelled ones).
    pub failed: usize,
    /// Tasks cancelled before they ran.
    pub cancelled: usize,
    /// Mean time a task held its resource.
    pub avg_elapsed: Duration,
    /// Mean time a task waited for a resource.
    pub avg_queued: Duration,
    /// Longest wait for a resource.
    pub max_queued: Duration,
}

impl BatchSummary {
    /// Summarize a set of completions.
    pub fn from_completed<T>(completed: &[Completed<T>]) -> Self {
        let total = completed.len();
        if total == 0 {
            return Self::default();
        }

        let succeeded = completed.iter().filter(|c| c.is_success()).count();
        let cancelled = completed
            .iter()
            .filter(|c| c.error().is_some_and(TaskError::is_cancelled))
            .count();
        let elapsed: Duration = completed.iter().map(|c| c.elapsed).sum();
        let queued: Duration = completed.iter().map(|c| c.queued).sum();
        let max_queued = completed.iter().map(|c| c.queued).max().unwrap_or_default();

        Self {
            total,
            succeeded,
            failed: total - succeeded,
            cancelled,
            avg_elapsed: mean(elapsed, total),
            avg_queued: mean(queued, total),
            max_queued,
        }
    }
}

/// Issues batches of tasks to a resource pool.
pub struct Dispatcher<R> {
    pool: ResourcePool<R>,
    config: DispatchConfig,
}

impl<R> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R> std::fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.pool.name())
            .field("config", &self.config)
            .finish()
    }
}

impl<R> Dispatcher<R>
where
    R: Send + 'static,
{
    /// Create a dispatcher with the default configuration.
    pub fn new(pool: ResourcePool<R>) -> Self {
        Self::with_config(pool, DispatchConfig::default())
    }

    /// Create a dispatcher with a custom configuration.
    pub fn with_config(pool: ResourcePool<R>, config: DispatchConfig) -> Self {
        Self { pool, config }
    }

    /// The pool tasks run against.
    pub fn pool(&self) -> &ResourcePool<R> {
        &self.pool
    }

    /// The dispatcher configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run a batch with the chosen discipline and wait for every result.
    ///
    /// The result at index `i` always belongs to task `i`.
    pub async fn dispatch<T>(&self, batch: Batch<T>, discipline: Discipline) -> Vec<Completed<T::Output>>
    where
        T: Task<R>,
    {
        match discipline {
            Discipline::Sequential => self.run_sequential(batch).await,
            Discipline::Concurrent => self.run_concurrent(batch).await,
        }
    }

    /// Run a batch and return its values in submission order, or a
    /// [`BatchError`] naming every task that failed.
    pub async fn gather<T>(&self, batch: Batch<T>, discipline: Discipline) -> Result<Vec<T::Output>, BatchError>
    where
        T: Task<R>,
    {
        collect_values(self.dispatch(batch, discipline).await)
    }

    /// Run tasks one at a time, in submission order.
    pub async fn run_sequential<T>(&self, batch: Batch<T>) -> Vec<Completed<T::Output>>
    where
        T: Task<R>,
    {
        let total = batch.len();
        let tracker = BatchTracker::new(total);
        let started = Instant::now();
        let mut results = Vec::with_capacity(total);
        let mut stopped = false;

        for (task_id, task) in batch.into_entries() {
            if stopped {
                tracker.transition(task_id, TaskState::Failed);
                results.push(Completed::failed(task_id, Duration::ZERO, TaskError::cancelled(task_id)));
                continue;
            }

            let submitted = Instant::now();
            let acquired = self.pool.acquire().await;
            let completed = run_task(task_id, task, acquired, submitted, &tracker).await;

            if !completed.is_success() && self.config.failure_policy == FailurePolicy::FailFast {
                warn!(task_id = %task_id, "Stopping sequential batch after failure");
                stopped = true;
            }
            results.push(completed);
        }

        info!(
            pool = %self.pool.name(),
            tasks = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sequential batch finished"
        );
        results
    }

    /// Run every task concurrently and wait for all of them.
    ///
    /// Results are returned in submission order.
    pub async fn run_concurrent<T>(&self, batch: Batch<T>) -> Vec<Completed<T::Output>>
    where
        T: Task<R>,
    {
        let total = batch.len();
        let started = Instant::now();
        let mut slots: Vec<Option<Completed<T::Output>>> = (0..total).map(|_| None).collect();
        let mut completions = self.as_completed(batch);

        // Draining to the end means no task still holds a resource on return.
        while let Some(completed) = completions.next().await {
            let failed = !completed.is_success();
            let task_id = completed.task_id;
            if let Some(slot) = slots.get_mut(task_id.index()) {
                *slot = Some(completed);
            }
            if failed
                && self.config.failure_policy == FailurePolicy::FailFast
                && !completions.is_cancelled()
            {
                warn!(task_id = %task_id, "Stopping concurrent batch after failure");
                completions.cancel_pending();
            }
        }

        info!(
            pool = %self.pool.name(),
            tasks = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Concurrent batch finished"
        );

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let task_id = TaskId(index);
                    Completed::failed(task_id, Duration::ZERO, TaskError::cancelled(task_id))
                })
            })
            .collect()
    }

    /// Run every task concurrently and stream results as they finish.
    ///
    /// Must be called from within a tokio runtime. Tasks start immediately,
    /// whether or not the returned stream is polled.
    pub fn as_completed<T>(&self, batch: Batch<T>) -> Completions<T::Output, R>
    where
        T: Task<R>,
    {
        let total = batch.len();
        let tracker = BatchTracker::new(total);
        let (sender, receiver) = mpsc::unbounded_channel();
        let (cancel, cancelled) = watch::channel(false);

        debug!(pool = %self.pool.name(), tasks = total, "Submitting concurrent batch");

        for (task_id, task) in batch.into_entries() {
            let pool = self.pool.clone();
            let tracker = tracker.clone();
            let sender = sender.clone();
            let mut cancelled = cancelled.clone();

            tokio::spawn(async move {
                let submitted = Instant::now();
                let acquired = tokio::select! {
                    biased;
                    _ = sender.closed() => {
                        tracker.transition(task_id, TaskState::Failed);
                        debug!(task_id = %task_id, "Task dropped before start");
                        return;
                    }
                    _ = async { let _ = cancelled.wait_for(|cancel| *cancel).await; } => {
                        tracker.transition(task_id, TaskState::Failed);
                        debug!(task_id = %task_id, "Task cancelled before start");
                        let _ = sender.send(Completed::failed(
                            task_id,
                            submitted.elapsed(),
                            TaskError::cancelled(task_id),
                        ));
                        return;
                    }
                    acquired = pool.acquire() => acquired,
                };

                let completed = run_task(task_id, task, acquired, submitted, &tracker).await;
                // The consumer may have gone away; the result is simply dropped.
                let _ = sender.send(completed);
            });
        }

        Completions::new(receiver, cancel, tracker, self.pool.clone(), total)
    }
}

/// Turn wait-for-all results into values, or a [`BatchError`] listing every failure.
pub fn collect_values<T>(completed: Vec<Completed<T>>) -> Result<Vec<T>, BatchError> {
    let total = completed.len();
    let mut values = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for item in completed {
        match item.result {
            Ok(value) => values.push(value),
            Err(error) => failures.push(error),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        failures.sort_by_key(|e| e.task_id);
        Err(BatchError { total, failures })
    }
}

async fn run_task<R, T>(
    task_id: TaskId,
    task: T,
    acquired: CoreResult<PooledResource<R>>,
    submitted: Instant,
    tracker: &BatchTracker,
) -> Completed<T::Output>
where
    R: Send + 'static,
    T: Task<R>,
{
    let queued = submitted.elapsed();
    let mut resource = match acquired {
        Ok(resource) => resource,
        Err(error) => {
            tracker.transition(task_id, TaskState::Failed);
            warn!(task_id = %task_id, error = %error, "Task could not acquire a resource");
            return Completed::failed(task_id, queued, TaskError::new(task_id, error));
        }
    };

    tracker.transition(task_id, TaskState::Running);
    let label = task.label();
    let started = Instant::now();
    let outcome = AssertUnwindSafe(task.run(&mut resource)).catch_unwind().await;
    let elapsed = started.elapsed();
    resource.release();

    let result = match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(TaskError::execution(task_id, error)),
        Err(panic) => Err(TaskError::new(
            task_id,
            TaskErrorKind::Panicked(panic_message(panic.as_ref())),
        )),
    };

    match &result {
        Ok(_) => {
            tracker.transition(task_id, TaskState::Done);
            debug!(
                task_id = %task_id,
                task = %label,
                queued_us = queued.as_micros() as u64,
                elapsed_us = elapsed.as_micros() as u64,
                "Task finished"
            );
        }
        Err(error) => {
            tracker.transition(task_id, TaskState::Failed);
            warn!(task_id = %task_id, task = %label, error = %error, "Task failed");
        }
    }

    Completed {
        task_id,
        queued,
        elapsed,
        result,
    }
}

fn mean(sum: Duration, count: usize) -> Duration {
    let nanos = sum.as_nanos() / count.max(1) as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Resource that records how many holders it has at once.
    struct Probe {
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
    }

    fn probe_pool(capacity: usize) -> (ResourcePool<Probe>, Arc<AtomicUsize>) {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let resources = (0..capacity)
            .map(|_| Probe {
                active: Arc::clone(&active),
                max_active: Arc::clone(&max_active),
            })
            .collect();
        (ResourcePool::new(resources).unwrap(), max_active)
    }

    /// Sleeps for `delay_ms`, then returns `value` or fails if `value` is negative.
    struct Step {
        value: i64,
        delay_ms: u64,
    }

    #[async_trait]
    impl Task<Probe> for Step {
        type Output = i64;
        type Error = String;

        async fn run(self, probe: &mut Probe) -> Result<i64, String> {
            let now = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
            probe.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            probe.active.fetch_sub(1, Ordering::SeqCst);

            if self.value < 0 {
                Err(format!("negative value {}", self.value))
            } else {
                Ok(self.value)
            }
        }
    }

    struct Explode;

    #[async_trait]
    impl Task<Probe> for Explode {
        type Output = i64;
        type Error = String;

        async fn run(self, _probe: &mut Probe) -> Result<i64, String> {
            panic!("kaboom");
        }
    }

    fn steps(values: &[i64], delay_ms: u64) -> Batch<Step> {
        values.iter().map(|&value| Step { value, delay_ms }).collect()
    }

    #[tokio::test]
    async fn test_sequential_preserves_order() {
        let (pool, max_active) = probe_pool(4);
        let dispatcher = Dispatcher::new(pool);

        let results = dispatcher.run_sequential(steps(&[3, 1, 2], 1)).await;

        let values: Vec<_> = results.iter().map(|c| *c.value().unwrap()).collect();
        assert_eq!(values, vec![3, 1, 2]);
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.pool().status().peak_in_use, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_respects_capacity() {
        let (pool, max_active) = probe_pool(3);
        let dispatcher = Dispatcher::new(pool);

        let values: Vec<i64> = (0..20).collect();
        let results = dispatcher.run_concurrent(steps(&values, 5)).await;

        assert_eq!(results.len(), 20);
        for (index, completed) in results.iter().enumerate() {
            assert_eq!(completed.task_id, TaskId(index));
            assert_eq!(completed.value(), Some(&(index as i64)));
        }
        assert!(max_active.load(Ordering::SeqCst) <= 3);
        assert!(dispatcher.pool().status().peak_in_use <= 3);
    }

    #[tokio::test]
    async fn test_gather_accumulates_failures() {
        let (pool, _) = probe_pool(2);
        let dispatcher = Dispatcher::new(pool);

        let err = dispatcher
            .gather(steps(&[1, -2, 3, -4], 1), Discipline::Concurrent)
            .await
            .unwrap_err();

        assert_eq!(err.total, 4);
        assert_eq!(err.failed_task_ids(), vec![TaskId(1), TaskId(3)]);
        assert!(err.failures.iter().all(|e| !e.is_cancelled()));

        let values = dispatcher
            .gather(steps(&[5, 6], 1), Discipline::Sequential)
            .await
            .unwrap();
        assert_eq!(values, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_sequential_fail_fast_cancels_rest() {
        let (pool, _) = probe_pool(1);
        let config = DispatchConfig::default().with_failure_policy(FailurePolicy::FailFast);
        let dispatcher = Dispatcher::with_config(pool, config);

        let results = dispatcher.run_sequential(steps(&[1, -1, 2, 3], 1)).await;

        assert_eq!(results.len(), 4);
        assert!(results[0].is_success());
        assert!(!results[1].error().unwrap().is_cancelled());
        assert!(results[2].error().unwrap().is_cancelled());
        assert!(results[3].error().unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn test_concurrent_fail_fast_cancels_backlog() {
        let (pool, _) = probe_pool(1);
        let config = DispatchConfig::default().with_failure_policy(FailurePolicy::FailFast);
        let dispatcher = Dispatcher::with_config(pool, config);

        let mut tasks = vec![Step { value: -1, delay_ms: 1 }];
        tasks.extend((0..10).map(|value| Step { value, delay_ms: 20 }));
        let results = dispatcher.run_concurrent(Batch::new(tasks)).await;

        assert_eq!(results.len(), 11);
        assert_eq!(results[0].error().map(|e| e.is_cancelled()), Some(false));
        let cancelled = results
            .iter()
            .filter(|c| c.error().is_some_and(TaskError::is_cancelled))
            .count();
        assert!(cancelled >= 9, "expected the backlog to be cancelled, got {cancelled}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fail_fast_reports_running_tasks() {
        let (pool, _) = probe_pool(2);
        let config = DispatchConfig::default().with_failure_policy(FailurePolicy::FailFast);
        let dispatcher = Dispatcher::with_config(pool, config);

        let mut tasks = vec![Step { value: -1, delay_ms: 1 }, Step { value: 1, delay_ms: 50 }];
        tasks.extend((2..8).map(|value| Step { value, delay_ms: 50 }));
        let results = dispatcher.run_concurrent(Batch::new(tasks)).await;

        assert_eq!(results.len(), 8);
        assert_eq!(dispatcher.pool().status().in_use, 0);
        assert!(!results[0].error().unwrap().is_cancelled());
        // Task 1 already held a resource when task 0 failed.
        assert_eq!(results[1].value(), Some(&1));
        for completed in results.iter().filter(|c| c.error().is_some_and(TaskError::is_cancelled)) {
            assert_eq!(completed.elapsed, Duration::ZERO);
        }
        let cancelled = results
            .iter()
            .filter(|c| c.error().is_some_and(TaskError::is_cancelled))
            .count();
        assert!(cancelled >= 5, "expected the backlog to be cancelled, got {cancelled}");
    }

    #[tokio::test]
    async fn test_cancel_pending_still_yields_every_task() {
        let (pool, _) = probe_pool(1);
        let dispatcher = Dispatcher::new(pool);

        let mut completions = dispatcher.as_completed(steps(&[1, 2, 3, 4], 20));
        let first = completions.recv().await.unwrap();
        assert!(first.is_success());
        completions.cancel_pending();
        assert!(completions.is_cancelled());

        let mut rest = Vec::new();
        while let Some(done) = completions.recv().await {
            rest.push(done);
        }
        assert_eq!(rest.len(), 3);
        assert!(completions.progress().is_complete());
        assert_eq!(dispatcher.pool().status().in_use, 0);
    }

    #[tokio::test]
    async fn test_as_completed_yields_every_task_once() {
        let (pool, _) = probe_pool(2);
        let dispatcher = Dispatcher::new(pool);

        let batch: Batch<Step> = [40, 5, 25, 1, 10]
            .iter()
            .enumerate()
            .map(|(i, &delay_ms)| Step { value: i as i64, delay_ms })
            .collect();
        let completions = dispatcher.as_completed(batch);
        assert_eq!(completions.total(), 5);

        let mut seen: Vec<usize> = completions.map(|c| c.task_id.index()).collect().await;
        assert_eq!(seen.len(), 5);
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_as_completed_tracks_progress() {
        let (pool, _) = probe_pool(2);
        let dispatcher = Dispatcher::new(pool);

        let mut completions = dispatcher.as_completed(steps(&[1, 2, -3], 1));
        while completions.recv().await.is_some() {}

        assert_eq!(completions.remaining(), 0);
        let progress = completions.progress();
        assert_eq!((progress.done, progress.failed), (2, 1));
        assert!(completions.tracker().is_complete());
        assert_eq!(completions.pool_status().in_use, 0);
    }

    #[tokio::test]
    async fn test_dropping_completions_cancels_backlog() {
        let (pool, _) = probe_pool(1);
        let dispatcher = Dispatcher::new(pool.clone());

        let mut completions = dispatcher.as_completed(steps(&[0, 1, 2, 3, 4], 10));
        let first = completions.recv().await.unwrap();
        assert!(first.is_success());
        let tracker = completions.tracker().clone();
        drop(completions);

        // Let the in-flight task finish and the backlog observe the cancellation.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let progress = tracker.progress();
        assert!(progress.is_complete());
        assert!(progress.failed >= 3, "backlog should be cancelled: {progress:?}");
        assert_eq!(pool.status().in_use, 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported() {
        let (pool, _) = probe_pool(1);
        let dispatcher = Dispatcher::new(pool.clone());

        let results = dispatcher.run_sequential(Batch::new(vec![Explode])).await;

        match &results[0].error().unwrap().kind {
            TaskErrorKind::Panicked(message) => assert_eq!(message, "kaboom"),
            other => panic!("unexpected error: {other:?}"),
        }
        // The resource went back to the pool.
        assert_eq!(pool.status().available, 1);
    }

    #[tokio::test]
    async fn test_closed_pool_fails_every_task() {
        let (pool, _) = probe_pool(2);
        pool.close();
        let dispatcher = Dispatcher::new(pool);

        let err = dispatcher
            .gather(steps(&[1, 2, 3], 1), Discipline::Concurrent)
            .await
            .unwrap_err();

        assert_eq!(err.failures.len(), 3);
        assert!(
            err.failures
                .iter()
                .all(|e| e.kind == TaskErrorKind::Pool(crate::error::PoolError::Closed))
        );
    }

    #[tokio::test]
    async fn test_batch_summary() {
        let (pool, _) = probe_pool(2);
        let dispatcher = Dispatcher::new(pool);

        let results = dispatcher.run_concurrent(steps(&[1, -1, 2, 3], 2)).await;
        let summary = BatchSummary::from_completed(&results);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 0);
        assert!(summary.avg_elapsed >= Duration::from_millis(2));
        assert_eq!(BatchSummary::from_completed::<u8>(&[]), BatchSummary::default());
    }

    #[test]
    fn test_batch_summary_averages() {
        let completed = |id, queued_ms, elapsed_ms| Completed {
            task_id: TaskId(id),
            queued: Duration::from_millis(queued_ms),
            elapsed: Duration::from_millis(elapsed_ms),
            result: Ok::<u8, TaskError>(0),
        };
        let summary = BatchSummary::from_completed(&[
            completed(0, 0, 10),
            completed(1, 6, 20),
            completed(2, 3, 30),
        ]);

        assert_eq!(summary.avg_elapsed, Duration::from_millis(20));
        assert_eq!(summary.avg_queued, Duration::from_millis(3));
        assert_eq!(summary.max_queued, Duration::from_millis(6));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (pool, _) = probe_pool(1);
        let dispatcher = Dispatcher::new(pool);

        assert!(dispatcher.run_concurrent(Batch::<Step>::new(Vec::new())).await.is_empty());
        assert_eq!(
            dispatcher
                .gather(Batch::<Step>::new(Vec::new()), Discipline::Sequential)
                .await
                .unwrap(),
            Vec::<i64>::new()
        );
    }
}
