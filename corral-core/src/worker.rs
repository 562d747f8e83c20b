//! OS worker threads as pool resources.
//!
//! A [`Worker`] owns one dedicated thread. Jobs are sent to it over a
//! channel and their results come back through a oneshot, so the async
//! caller suspends while the thread computes. A pool of `C` workers runs at
//! most `C` CPU-bound jobs in parallel, outside the tokio scheduler.

use std::any::Any;
use std::hint::black_box;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::error::CoreResult;
use crate::pool::{PoolConfig, ResourcePool};
use crate::task::Task;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Errors from a worker thread.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The OS refused to start the thread.
    #[error("failed to spawn worker thread {id}: {source}")]
    Spawn {
        /// Worker id.
        id: usize,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The thread is gone and cannot take jobs.
    #[error("worker {id} has stopped")]
    Stopped {
        /// Worker id.
        id: usize,
    },
}

/// A pool resource backed by one OS thread.
pub struct Worker {
    id: usize,
    jobs: Option<mpsc::UnboundedSender<Job>>,
    handle: Option<JoinHandle<()>>,
    taken: Arc<AtomicU64>,
}

impl Worker {
    /// Start a worker thread named `corral-worker-{id}`.
    pub fn spawn(id: usize) -> Result<Self, WorkerError> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let taken = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&taken);

        let handle = thread::Builder::new()
            .name(format!("corral-worker-{id}"))
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    counter.fetch_add(1, Ordering::Relaxed);
                    job();
                }
                trace!(worker = id, "Worker thread exiting");
            })
            .map_err(|source| WorkerError::Spawn { id, source })?;

        debug!(worker = id, "Worker thread started");
        Ok(Self {
            id,
            jobs: Some(sender),
            handle: Some(handle),
            taken,
        })
    }

    /// Worker id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Number of jobs this worker's thread has picked up.
    pub fn jobs_taken(&self) -> u64 {
        self.taken.load(Ordering::Relaxed)
    }

    /// Run `job` on this worker's thread and wait for its result.
    ///
    /// A panic inside `job` is resumed on the calling task.
    pub async fn run<F, T>(&self, job: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply, result) = oneshot::channel::<Result<T, Box<dyn Any + Send>>>();
        let boxed: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job));
            // The caller may have stopped waiting.
            let _ = reply.send(outcome);
        });

        let stopped = WorkerError::Stopped { id: self.id };
        match &self.jobs {
            Some(jobs) if jobs.send(boxed).is_ok() => {}
            _ => return Err(stopped),
        }

        match result.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(stopped),
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("jobs_taken", &self.jobs_taken())
            .finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the channel ends the thread's receive loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = self.id, "Worker thread panicked");
            } else {
                debug!(worker = self.id, "Worker thread joined");
            }
        }
    }
}

/// Build a pool of `config.capacity` worker threads.
pub fn worker_pool(config: &PoolConfig) -> CoreResult<ResourcePool<Worker>> {
    ResourcePool::from_fn(config, Worker::spawn)
}

/// Count from zero up to `n`, one increment at a time.
pub fn count(n: u64) -> u64 {
    let mut counter = 0u64;
    while counter < n {
        counter = black_box(counter + 1);
    }
    counter
}

/// CPU-bound task: count to `count_to` on a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountTask {
    /// Target value.
    pub count_to: u64,
}

impl CountTask {
    /// Create a count task.
    pub fn new(count_to: u64) -> Self {
        Self { count_to }
    }
}

#[async_trait]
impl Task<Worker> for CountTask {
    type Output = u64;
    type Error = WorkerError;

    async fn run(self, worker: &mut Worker) -> Result<u64, WorkerError> {
        let n = self.count_to;
        worker.run(move || count(n)).await
    }

    fn label(&self) -> String {
        format!("count({})", self.count_to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Dispatcher;
    use crate::task::Batch;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_count() {
        assert_eq!(count(0), 0);
        assert_eq!(count(22), 22);
    }

    #[tokio::test]
    async fn test_worker_runs_jobs_on_its_thread() {
        let worker = Worker::spawn(7).unwrap();
        let name = worker
            .run(|| thread::current().name().map(str::to_string))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("corral-worker-7"));
        assert_eq!(worker.run(|| 2 + 2).await.unwrap(), 4);
        assert_eq!(worker.id(), 7);
    }

    #[tokio::test]
    async fn test_worker_survives_job_panic() {
        let worker = Worker::spawn(1).unwrap();
        let caught = futures::FutureExt::catch_unwind(AssertUnwindSafe(worker.run(|| -> u8 {
            panic!("bad job")
        })))
        .await;
        assert!(caught.is_err());
        assert_eq!(worker.run(|| 1u8).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_joins_threads() {
        let pool = worker_pool(&PoolConfig::new(2)).unwrap();
        let dispatcher = Dispatcher::new(pool.clone());
        let values = dispatcher
            .gather(Batch::new([CountTask::new(3), CountTask::new(4)]), crate::dispatch::Discipline::Concurrent)
            .await
            .unwrap();
        assert_eq!(values, vec![3, 4]);

        let workers = pool.shutdown().await;
        assert_eq!(workers.len(), 2);
        let jobs: u64 = workers.iter().map(Worker::jobs_taken).sum();
        assert_eq!(jobs, 2);
        drop(workers);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_short_counts_finish_before_long_ones() {
        let pool = worker_pool(&PoolConfig::new(4)).unwrap();
        let dispatcher = Dispatcher::new(pool);

        let targets = [100_000_001, 1, 3, 5, 22, 100_000_000];
        let batch: Batch<CountTask> = targets.iter().copied().map(CountTask::new).collect();

        let finished: Vec<u64> = dispatcher
            .as_completed(batch)
            .map(|completed| completed.into_result().unwrap())
            .collect()
            .await;

        assert_eq!(finished.len(), 6);
        let mut short: Vec<u64> = finished[..4].to_vec();
        short.sort();
        assert_eq!(short, vec![1, 3, 5, 22]);
        let mut long: Vec<u64> = finished[4..].to_vec();
        long.sort();
        assert_eq!(long, vec![100_000_000, 100_000_001]);
    }
}
