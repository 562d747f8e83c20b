//! Task descriptors and batches.
//!
//! A task is an immutable description of work that needs exclusive use of
//! one pool resource while it runs. [`Task::run`] takes `self` by value, so
//! each descriptor is consumed by exactly one dispatch attempt.
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use corral_core::Task;
//!
//! struct Ping;
//!
//! #[async_trait]
//! impl Task<Connection> for Ping {
//!     type Output = u64;
//!     type Error = std::io::Error;
//!
//!     async fn run(self, conn: &mut Connection) -> Result<u64, Self::Error> {
//!         conn.ping().await
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Position of a task within its batch (the submission index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub usize);

impl TaskId {
    /// Get the submission index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A unit of work executed against one pool resource of type `R`.
#[async_trait]
pub trait Task<R>: Send + 'static
where
    R: Send + 'static,
{
    /// Value produced on success.
    type Output: Send + 'static;
    /// Error produced by the work itself.
    type Error: fmt::Display + Send + 'static;

    /// Run the task while holding `resource` exclusively.
    async fn run(self, resource: &mut R) -> Result<Self::Output, Self::Error>;

    /// Short label used in logs.
    fn label(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("task")
            .to_string()
    }
}

/// An ordered sequence of tasks submitted together.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    tasks: Vec<T>,
}

impl<T> Batch<T> {
    /// Create a batch from tasks in submission order.
    pub fn new(tasks: impl IntoIterator<Item = T>) -> Self {
        Self {
            tasks: tasks.into_iter().collect(),
        }
    }

    /// Create a batch of `n` tasks built from their index.
    pub fn from_fn(n: usize, f: impl FnMut(usize) -> T) -> Self {
        Self {
            tasks: (0..n).map(f).collect(),
        }
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterate over the tasks in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tasks.iter()
    }

    /// Consume the batch, pairing every task with its id.
    pub fn into_entries(self) -> impl Iterator<Item = (TaskId, T)> {
        self.tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| (TaskId(index), task))
    }
}

impl<T> FromIterator<T> for Batch<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<T> From<Vec<T>> for Batch<T> {
    fn from(tasks: Vec<T>) -> Self {
        Self { tasks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_entries_follow_submission_order() {
        let batch: Batch<&str> = ["a", "b", "c"].into_iter().collect();
        assert_eq!(batch.len(), 3);

        let entries: Vec<_> = batch.into_entries().collect();
        assert_eq!(entries, vec![(TaskId(0), "a"), (TaskId(1), "b"), (TaskId(2), "c")]);
    }

    #[test]
    fn test_batch_from_fn() {
        let batch = Batch::from_fn(4, |i| i * 10);
        assert_eq!(batch.iter().copied().collect::<Vec<_>>(), vec![0, 10, 20, 30]);
        assert!(Batch::<u8>::new(Vec::new()).is_empty());
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId(7).to_string(), "#7");
        assert_eq!(TaskId(7).index(), 7);
    }
}
