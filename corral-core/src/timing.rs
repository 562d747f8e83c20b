//! Wall-clock timing for batches.
//!
//! [`timed`] wraps any future, measures how long it took and reports the
//! measurement to a [`TimingSink`]. It never changes what the future does.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Receives `(label, elapsed)` measurements.
pub trait TimingSink: Send + Sync {
    /// Record one measurement.
    fn record(&self, label: &str, elapsed: Duration);
}

/// Sink that emits an `info` event per measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TimingSink for TracingSink {
    fn record(&self, label: &str, elapsed: Duration) {
        info!(
            label = %label,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Finished timed section"
        );
    }
}

/// Sink that keeps every measurement in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<(String, Duration)>>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All measurements so far, oldest first.
    pub fn records(&self) -> Vec<(String, Duration)> {
        self.records.lock().clone()
    }

    /// The latest measurement for `label`.
    pub fn last(&self, label: &str) -> Option<Duration> {
        self.records
            .lock()
            .iter()
            .rev()
            .find(|(l, _)| l == label)
            .map(|(_, elapsed)| *elapsed)
    }
}

impl TimingSink for RecordingSink {
    fn record(&self, label: &str, elapsed: Duration) {
        self.records.lock().push((label.to_string(), elapsed));
    }
}

/// A value together with how long it took to produce.
#[derive(Debug, Clone)]
pub struct Timed<T> {
    /// Label the measurement was reported under.
    pub label: String,
    /// Wall-clock time from start to completion.
    pub elapsed: Duration,
    /// The future's output.
    pub value: T,
}

impl<T> Timed<T> {
    /// Discard the timing and keep the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Transform the value, keeping the timing.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timed<U> {
        Timed {
            label: self.label,
            elapsed: self.elapsed,
            value: f(self.value),
        }
    }
}

/// Time `future` and report the result to the tracing sink.
pub async fn timed<F>(label: impl Into<String>, future: F) -> Timed<F::Output>
where
    F: Future,
{
    timed_with(&TracingSink, label, future).await
}

/// Time `future` and report the result to `sink`.
pub async fn timed_with<F>(sink: &dyn TimingSink, label: impl Into<String>, future: F) -> Timed<F::Output>
where
    F: Future,
{
    let label = label.into();
    let start = Instant::now();
    let value = future.await;
    let elapsed = start.elapsed();
    sink.record(&label, elapsed);

    Timed { label, elapsed, value }
}

/// Elapsed time of the same workload under both disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Sequential elapsed time.
    pub sequential: Duration,
    /// Concurrent elapsed time.
    pub concurrent: Duration,
}

impl Comparison {
    /// Create a comparison.
    pub fn new(sequential: Duration, concurrent: Duration) -> Self {
        Self { sequential, concurrent }
    }

    /// How many times faster the concurrent run was.
    ///
    /// Returns `None` if the concurrent run took no measurable time.
    pub fn speedup(&self) -> Option<f64> {
        let concurrent = self.concurrent.as_secs_f64();
        (concurrent > 0.0).then(|| self.sequential.as_secs_f64() / concurrent)
    }

    /// Time saved by running concurrently (zero if it was slower).
    pub fn saved(&self) -> Duration {
        self.sequential.saturating_sub(self.concurrent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_timed_reports_to_sink() {
        let sink = RecordingSink::new();

        let timed = timed_with(&sink, "sleep", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            42
        })
        .await;

        assert_eq!(timed.value, 42);
        assert_eq!(timed.label, "sleep");
        assert!(timed.elapsed >= Duration::from_millis(10));
        assert_eq!(sink.last("sleep"), Some(timed.elapsed));
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.last("other"), None);
    }

    #[tokio::test]
    async fn test_timed_map_keeps_timing() {
        let timed = timed("double", async { 21 }).await;
        let elapsed = timed.elapsed;
        let doubled = timed.map(|v| v * 2);
        assert_eq!(doubled.value, 42);
        assert_eq!(doubled.elapsed, elapsed);
        assert_eq!(doubled.into_value(), 42);
    }

    #[test]
    fn test_comparison_speedup() {
        let comparison = Comparison::new(Duration::from_secs(6), Duration::from_secs(2));
        assert_eq!(comparison.speedup(), Some(3.0));
        assert_eq!(comparison.saved(), Duration::from_secs(4));

        let slower = Comparison::new(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(slower.saved(), Duration::ZERO);
        assert_eq!(Comparison::new(Duration::from_secs(1), Duration::ZERO).speedup(), None);
    }
}
