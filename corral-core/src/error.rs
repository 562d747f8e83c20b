//! Error types for pools, tasks and batches.
//!
//! Errors carry an [`ErrorCode`] for programmatic handling. Codes follow the
//! pattern `C{category}{number}`:
//! - 1xxx: Pool errors (capacity, exhaustion, closed)
//! - 2xxx: Task errors (execution, panic, cancellation)
//! - 3xxx: Batch errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use corral_core::{ErrorCode, PoolError};
//!
//! let err = PoolError::Closed;
//! assert_eq!(err.code(), ErrorCode::PoolClosed);
//! assert_eq!(err.code().code(), "C1003");
//! ```

use std::fmt;

use thiserror::Error;

use crate::task::TaskId;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, PoolError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Pool errors (1xxx)
    /// Pool constructed with zero resources (C1001).
    InvalidCapacity = 1001,
    /// No resource became free before the acquire deadline (C1002).
    PoolExhausted = 1002,
    /// Acquire attempted after teardown began (C1003).
    PoolClosed = 1003,
    /// A pool resource could not be created (C1004).
    ResourceInit = 1004,

    // Task errors (2xxx)
    /// The task's own work returned an error (C2001).
    TaskExecution = 2001,
    /// The task panicked while holding a resource (C2002).
    TaskPanicked = 2002,
    /// The task was cancelled before it ran (C2003).
    TaskCancelled = 2003,

    // Batch errors (3xxx)
    /// One or more tasks in a batch failed (C3001).
    BatchFailed = 3001,

    // Internal errors (9xxx)
    /// Internal error (C9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "C1002").
    pub fn code(&self) -> String {
        format!("C{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidCapacity => "Invalid pool capacity",
            Self::PoolExhausted => "Pool exhausted",
            Self::PoolClosed => "Pool closed",
            Self::ResourceInit => "Resource initialization failed",
            Self::TaskExecution => "Task execution failed",
            Self::TaskPanicked => "Task panicked",
            Self::TaskCancelled => "Task cancelled",
            Self::BatchFailed => "Batch failed",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by a [`ResourcePool`](crate::pool::ResourcePool).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was built with no resources.
    #[error("pool capacity must be at least 1")]
    InvalidCapacity,

    /// `acquire()` did not get a resource before the configured deadline.
    #[error("no pool resource became free within {waited_ms}ms")]
    ExhaustedTimeout {
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// `acquire()` was called after teardown began.
    #[error("pool is closed")]
    Closed,

    /// A resource factory failed while the pool was being built.
    #[error("failed to create pool resource {index}: {message}")]
    ResourceInit {
        /// Index of the resource that failed.
        index: usize,
        /// Factory error message.
        message: String,
    },
}

impl PoolError {
    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCapacity => ErrorCode::InvalidCapacity,
            Self::ExhaustedTimeout { .. } => ErrorCode::PoolExhausted,
            Self::Closed => ErrorCode::PoolClosed,
            Self::ResourceInit { .. } => ErrorCode::ResourceInit,
        }
    }

    /// Check if this is an acquire timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ExhaustedTimeout { .. })
    }
}

/// What went wrong with a single task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskErrorKind {
    /// The task never got a resource.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The task's work returned an error.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The task panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// The task was cancelled before it acquired a resource.
    #[error("cancelled before start")]
    Cancelled,
}

/// Error from one task in a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task {task_id} {kind}")]
pub struct TaskError {
    /// The task that failed.
    pub task_id: TaskId,
    /// The failure.
    pub kind: TaskErrorKind,
}

impl TaskError {
    /// Create a task error.
    pub fn new(task_id: TaskId, kind: impl Into<TaskErrorKind>) -> Self {
        Self {
            task_id,
            kind: kind.into(),
        }
    }

    /// Create an execution error from anything displayable.
    pub fn execution(task_id: TaskId, message: impl fmt::Display) -> Self {
        Self::new(task_id, TaskErrorKind::Execution(message.to_string()))
    }

    /// Create a cancellation error.
    pub fn cancelled(task_id: TaskId) -> Self {
        Self::new(task_id, TaskErrorKind::Cancelled)
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match &self.kind {
            TaskErrorKind::Pool(e) => e.code(),
            TaskErrorKind::Execution(_) => ErrorCode::TaskExecution,
            TaskErrorKind::Panicked(_) => ErrorCode::TaskPanicked,
            TaskErrorKind::Cancelled => ErrorCode::TaskCancelled,
        }
    }

    /// Check if the task was cancelled rather than failing on its own.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, TaskErrorKind::Cancelled)
    }
}

/// Batch-level failure listing every task that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} of {total} tasks failed (tasks {})", failures.len(), failed_ids(failures))]
pub struct BatchError {
    /// Number of tasks in the batch.
    pub total: usize,
    /// Failed tasks, in submission order.
    pub failures: Vec<TaskError>,
}

impl BatchError {
    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::BatchFailed
    }

    /// Ids of the tasks that failed.
    pub fn failed_task_ids(&self) -> Vec<TaskId> {
        self.failures.iter().map(|e| e.task_id).collect()
    }

    /// The first failure that was not a cancellation, if any.
    pub fn root_cause(&self) -> Option<&TaskError> {
        self.failures.iter().find(|e| !e.is_cancelled())
    }
}

fn failed_ids(failures: &[TaskError]) -> String {
    failures
        .iter()
        .map(|e| e.task_id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
