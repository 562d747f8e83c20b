//! `corral bench` command - Sequential vs. concurrent product queries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use corral_core::{Batch, BatchSummary, Comparison, Completed, Task, TaskError, Timed, timed};
use corral_postgres::{PgConnection, PgError, PgPool, ProductQuery};

use crate::cli::BenchArgs;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv};

/// Runs a product query and keeps only the number of rows.
struct RowCount(ProductQuery);

#[async_trait]
impl Task<PgConnection> for RowCount {
    type Output = usize;
    type Error = PgError;

    async fn run(self, conn: &mut PgConnection) -> Result<usize, PgError> {
        Ok(self.0.run(conn).await?.len())
    }

    fn label(&self) -> String {
        self.0.label()
    }
}

/// Outcome of one timed batch.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Wall-clock time for the whole batch, in milliseconds.
    pub elapsed_ms: f64,
    /// Queries that returned rows without error.
    pub succeeded: usize,
    /// Queries that failed.
    pub failed: usize,
    /// Mean time a query held its connection, in milliseconds.
    pub avg_query_ms: f64,
    /// Mean time a query waited for a connection, in milliseconds.
    pub avg_wait_ms: f64,
    /// Most connections in use at once.
    pub peak_connections: usize,
    /// Rows returned by each query.
    pub rows_per_query: usize,
    /// First error, if any.
    pub first_error: Option<String>,
}

impl RunReport {
    fn new(run: &Timed<Vec<Completed<usize>>>, peak_connections: usize) -> Self {
        let summary = BatchSummary::from_completed(&run.value);
        Self {
            elapsed_ms: millis(run.elapsed),
            succeeded: summary.succeeded,
            failed: summary.failed,
            avg_query_ms: millis(summary.avg_elapsed),
            avg_wait_ms: millis(summary.avg_queued),
            peak_connections,
            rows_per_query: run.value.iter().find_map(|c| c.value().copied()).unwrap_or(0),
            first_error: run
                .value
                .iter()
                .find_map(Completed::error)
                .map(TaskError::to_string),
        }
    }
}

/// Full benchmark report.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    /// Queries per run.
    pub queries: usize,
    /// Pool size.
    pub connections: usize,
    /// Product looked up.
    pub product_id: i32,
    /// Sequential run, unless skipped.
    pub sequential: Option<RunReport>,
    /// Concurrent run.
    pub concurrent: RunReport,
    /// Sequential time divided by concurrent time.
    pub speedup: Option<f64>,
}

/// Run the bench command
pub async fn run(args: BenchArgs, config: &Config) -> CliResult<()> {
    let pg = config.pg_config(args.connection.url.as_deref())?;
    let pool_config = config.connection_pool(args.connections);
    let queries = args.queries.unwrap_or(config.bench.queries);
    let product_id = args.product_id.unwrap_or(config.bench.product_id);
    let skip_sequential = args.skip_sequential || config.bench.skip_sequential;
    let connections = pool_config.capacity;

    if !args.json {
        output::header("Query Benchmark");
        kv("Database", &pg.redacted_url());
        kv("Queries", &queries.to_string());
        kv("Connections", &connections.to_string());
        kv("Product", &product_id.to_string());
        output::newline();
    }

    let pool = PgPool::with_pool_config(pg, pool_config).await?;
    let dispatcher = pool.dispatcher();
    let batch = || Batch::from_fn(queries, |_| RowCount(ProductQuery::new(product_id)));
    let steps = if skip_sequential { 1 } else { 2 };

    let sequential_run = if skip_sequential {
        None
    } else {
        if !args.json {
            output::step(1, steps, "Running queries sequentially...");
        }
        let run = timed("sequential", dispatcher.run_sequential(batch())).await;
        Some((run.elapsed, RunReport::new(&run, pool.status().peak_in_use)))
    };

    if !args.json {
        output::step(steps, steps, "Running queries concurrently...");
    }
    pool.resources().reset_peak();
    let run = timed("concurrent", dispatcher.run_concurrent(batch())).await;
    let concurrent = RunReport::new(&run, pool.status().peak_in_use);

    pool.close().await;

    let (speedup, sequential) = match sequential_run {
        Some((elapsed, report)) => (Comparison::new(elapsed, run.elapsed).speedup(), Some(report)),
        None => (None, None),
    };

    let report = BenchReport {
        queries,
        connections,
        product_id,
        sequential,
        concurrent,
        speedup,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    let failed = report.concurrent.failed + report.sequential.as_ref().map_or(0, |s| s.failed);
    if failed > 0 {
        return Err(CliError::Command(format!(
            "{failed} queries failed; first error: {}",
            report
                .sequential
                .as_ref()
                .and_then(|s| s.first_error.clone())
                .or_else(|| report.concurrent.first_error.clone())
                .unwrap_or_default()
        )));
    }
    Ok(())
}

fn print_report(report: &BenchReport) {
    output::newline();
    if let Some(sequential) = &report.sequential {
        print_run("Sequential", sequential);
    }
    print_run("Concurrent", &report.concurrent);

    if let Some(speedup) = report.speedup {
        output::success(&format!(
            "Concurrent run was {speedup:.2}x faster with {} connections",
            report.connections
        ));
    }
}

fn print_run(title: &str, run: &RunReport) {
    output::section(title);
    kv("Elapsed", &format!("{:.3}s", run.elapsed_ms / 1000.0));
    kv("Succeeded", &run.succeeded.to_string());
    if run.failed > 0 {
        kv("Failed", &output::style_error(&run.failed.to_string()));
    }
    kv("Avg query", &format!("{:.3}ms", run.avg_query_ms));
    kv("Avg wait", &format!("{:.3}ms", run.avg_wait_ms));
    kv("Peak connections", &run.peak_connections.to_string());
    kv("Rows per query", &run.rows_per_query.to_string());
    output::newline();
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
