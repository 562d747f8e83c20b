//! # corral-core
//!
//! A fixed-size resource pool and a batch dispatcher that runs more tasks
//! than there are resources.
//!
//! The pool bounds concurrency: no more than `capacity` tasks ever hold a
//! resource at once, and the rest wait in FIFO order. On top of it the
//! [`Dispatcher`] runs a [`Batch`] either sequentially or concurrently, and
//! collects concurrent results either all at once in submission order or
//! one at a time as they finish.
//!
//! ```rust,no_run
//! use corral_core::prelude::*;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = worker_pool(&PoolConfig::new(4))?;
//! let dispatcher = Dispatcher::new(pool);
//!
//! let batch: Batch<CountTask> = [100_000_001, 1, 3, 5, 22, 100_000_000]
//!     .into_iter()
//!     .map(CountTask::new)
//!     .collect();
//!
//! let mut completions = dispatcher.as_completed(batch);
//! while let Some(done) = completions.recv().await {
//!     println!("{} -> {:?}", done.task_id, done.result);
//! }
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod pool;
pub mod task;
pub mod timing;
pub mod worker;

pub use collector::{BatchProgress, BatchTracker, Completed, Completions, TaskState};
pub use dispatch::{
    BatchSummary, DispatchConfig, Dispatcher, Discipline, FailurePolicy, collect_values,
};
pub use error::{BatchError, CoreResult, ErrorCode, PoolError, TaskError, TaskErrorKind};
pub use pool::{PoolConfig, PoolStatus, PooledResource, ResourcePool};
pub use task::{Batch, Task, TaskId};
pub use timing::{Comparison, RecordingSink, Timed, TimingSink, TracingSink, timed, timed_with};
pub use worker::{CountTask, Worker, WorkerError, worker_pool};

/// Commonly used types.
pub mod prelude {
    pub use crate::collector::{Completed, Completions, TaskState};
    pub use crate::dispatch::{DispatchConfig, Dispatcher, Discipline, FailurePolicy};
    pub use crate::error::{BatchError, PoolError, TaskError};
    pub use crate::pool::{PoolConfig, ResourcePool};
    pub use crate::task::{Batch, Task, TaskId};
    pub use crate::timing::{Comparison, timed};
    pub use crate::worker::{CountTask, Worker, worker_pool};
}
